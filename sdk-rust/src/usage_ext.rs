use crate::{LanguageModelPricing, ModelUsage};

impl ModelUsage {
    /// Cost of a request with this usage that carried `image_count` images.
    #[must_use]
    pub fn calculate_cost(&self, pricing: &LanguageModelPricing, image_count: u32) -> f64 {
        f64::from(self.input_tokens) / 1000.0 * pricing.input_cost_per_1k_tokens
            + f64::from(self.output_tokens) / 1000.0 * pricing.output_cost_per_1k_tokens
            + f64::from(image_count) * pricing.cost_per_image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pricing() -> LanguageModelPricing {
        LanguageModelPricing {
            input_cost_per_1k_tokens: 0.005,
            output_cost_per_1k_tokens: 0.015,
            cost_per_image: 0.001_275,
        }
    }

    #[test]
    fn cost_combines_token_rates_and_image_flat_rate() {
        let usage = ModelUsage {
            input_tokens: 2000,
            output_tokens: 500,
        };

        let cost = usage.calculate_cost(&pricing(), 1);

        let expected = 2.0 * 0.005 + 0.5 * 0.015 + 0.001_275;
        assert!((cost - expected).abs() < 1e-12, "cost was {cost}");
    }

    #[test]
    fn zero_usage_without_images_is_free() {
        let cost = ModelUsage::default().calculate_cost(&pricing(), 0);
        assert!(cost.abs() < f64::EPSILON);
    }
}
