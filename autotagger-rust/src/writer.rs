use crate::analysis::{AnalysisResult, PhotoAnalysis};
use tagger_sdk::PhotoHost;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The analysis itself failed.
    AnalysisFailed,
    /// Title, description or keywords are empty.
    MissingFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every applicable call was issued. `failed_calls` of them failed.
    Written { failed_calls: usize },
    Skipped(SkipReason),
}

/// Check that an analysis carries everything a write needs.
pub fn validate(analysis: &PhotoAnalysis) -> Result<(), SkipReason> {
    if analysis.title.trim().is_empty()
        || analysis.description.trim().is_empty()
        || analysis.keywords.is_empty()
    {
        return Err(SkipReason::MissingFields);
    }
    Ok(())
}

/// Applies analysis results to photos on the host.
pub struct MetadataWriter<'a> {
    host: &'a dyn PhotoHost,
    dry_run: bool,
}

impl<'a> MetadataWriter<'a> {
    pub fn new(host: &'a dyn PhotoHost, dry_run: bool) -> Self {
        Self { host, dry_run }
    }

    /// Write tags, title and description, and the location when the result
    /// has one. The calls are independent: a failure is logged and counted
    /// and the remaining calls still run. Nothing is rolled back.
    pub async fn apply(&self, photo_id: &str, result: &AnalysisResult) -> WriteOutcome {
        let analysis = match result {
            AnalysisResult::Ok(analysis) => analysis,
            AnalysisResult::Err { error } => {
                debug!(photo_id, %error, "not writing failed analysis");
                return WriteOutcome::Skipped(SkipReason::AnalysisFailed);
            }
        };

        if let Err(reason) = validate(analysis) {
            warn!(photo_id, "analysis is missing a title, description or keywords, not writing");
            return WriteOutcome::Skipped(reason);
        }

        let tags = analysis.keywords.join(",");
        if self.dry_run {
            info!(
                photo_id,
                title = %analysis.title,
                description = %analysis.description,
                tags = %tags,
                "dry run, not writing"
            );
            return WriteOutcome::Written { failed_calls: 0 };
        }

        let mut failed_calls = 0;

        if let Err(error) = self.host.set_tags(photo_id, &tags).await {
            warn!(photo_id, %error, "failed to set tags");
            failed_calls += 1;
        }

        if let Err(error) = self
            .host
            .set_meta(photo_id, &analysis.title, &analysis.description)
            .await
        {
            warn!(photo_id, %error, "failed to set title and description");
            failed_calls += 1;
        }

        if let Some(location) = analysis.location {
            if let Err(error) = self
                .host
                .set_location(photo_id, location.latitude, location.longitude)
                .await
            {
                warn!(photo_id, %error, "failed to set location");
                failed_calls += 1;
            }
        }

        info!(photo_id, title = %analysis.title, failed_calls, "updated photo");
        WriteOutcome::Written { failed_calls }
    }
}
