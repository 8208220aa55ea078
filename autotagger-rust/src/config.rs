//! Run configuration.
//!
//! Values are resolved once at startup, in order of priority: command line,
//! environment (including a `.env` file), the TOML settings file, built-in
//! defaults. The resulting [`Config`] is passed by reference to every
//! component; nothing reads the environment after this point.

use crate::{
    analysis::AnalysisOptions, credential_store::CREDENTIAL_ENV, pipeline::PipelineOptions,
    AutotaggerError,
};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tagger_sdk::{ImageDetail, LanguageModelPricing, PrivacyFilter};
use tracing::{debug, info};

const DEFAULT_SETTINGS_FILE: &str = "autotagger.toml";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_PROMPT_COST_PER_1K: f64 = 0.000_15;
const DEFAULT_COMPLETION_COST_PER_1K: f64 = 0.000_6;
const DEFAULT_MAX_KEYWORDS: usize = 10;
const DEFAULT_PAGE_SIZE: usize = 100;
const MAX_PAGE_SIZE: usize = 500;
const DEFAULT_MAX_TOKENS: u32 = 300;
const DEFAULT_MAX_ANALYSIS_ATTEMPTS: usize = 2;
const DEFAULT_MAX_AUTHORIZATION_ATTEMPTS: usize = 3;
const DEFAULT_OUTPUT_PATH: &str = "flickr_metadata.json";
const DEFAULT_CREDENTIAL_PATH: &str = "flickr_token.json";
const DEFAULT_PLACEHOLDER_DESCRIPTIONS: [&str; 4] = ["OLYMPUS DIGITAL CAMERA", "DCIM", "IMG_", "DSC"];

/// Caption Flickr photos with a vision model and write the results back.
#[derive(Debug, Parser, Default)]
#[command(name = "flickr-autotagger", version, about)]
pub struct Args {
    /// TOML settings file. Defaults to `autotagger.toml` when present.
    #[arg(long, env = "AUTOTAGGER_SETTINGS")]
    pub settings: Option<PathBuf>,

    #[arg(long, env = "FLICKR_API_KEY", hide_env_values = true)]
    pub flickr_api_key: Option<String>,

    #[arg(long, env = "FLICKR_API_SECRET", hide_env_values = true)]
    pub flickr_api_secret: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Process only this album (photoset id) instead of every album.
    #[arg(long, env = "FLICKR_PHOTOSET_ID")]
    pub album_id: Option<String>,

    #[arg(long, env = "OPENAI_MODEL")]
    pub model: Option<String>,

    /// USD per 1000 prompt tokens.
    #[arg(long, env = "PROMPT_COST_PER_1K")]
    pub prompt_cost_per_1k: Option<f64>,

    /// USD per 1000 completion tokens.
    #[arg(long, env = "COMPLETION_COST_PER_1K")]
    pub completion_cost_per_1k: Option<f64>,

    /// Flat USD cost charged per analyzed image.
    #[arg(long, env = "IMAGE_COST")]
    pub image_cost: Option<f64>,

    /// 1 public, 2 friends, 3 family, 4 friends and family, 5 private.
    #[arg(long, env = "FLICKR_PRIVACY_FILTER")]
    pub privacy_filter: Option<u8>,

    #[arg(long, env = "MAX_KEYWORDS")]
    pub max_keywords: Option<usize>,

    /// Descriptions starting with one of these count as empty. JSON array or
    /// comma separated list.
    #[arg(long, env = "PLACEHOLDER_DESCRIPTIONS")]
    pub placeholder_descriptions: Option<String>,

    /// Albums whose title starts with one of these are skipped. JSON array or
    /// comma separated list.
    #[arg(long, env = "SKIP_ALBUM_PREFIXES")]
    pub skip_prefixes: Option<String>,

    #[arg(long, env = "OUTPUT_FILE")]
    pub output_path: Option<PathBuf>,

    #[arg(long, env = "FLICKR_TOKEN_FILE")]
    pub credential_path: Option<PathBuf>,

    /// Serialized credential, used when the credential file is absent.
    #[arg(long, env = CREDENTIAL_ENV, hide_env_values = true)]
    pub credential: Option<String>,

    #[arg(long, env = "ALBUM_PAGE_SIZE")]
    pub page_size: Option<usize>,

    /// Image detail level: low, high or auto.
    #[arg(long, env = "IMAGE_DETAIL")]
    pub detail: Option<String>,

    #[arg(long, env = "MAX_TOKENS")]
    pub max_tokens: Option<u32>,

    #[arg(long, env = "MAX_ANALYSIS_ATTEMPTS")]
    pub max_analysis_attempts: Option<usize>,

    #[arg(long, env = "MAX_AUTHORIZATION_ATTEMPTS")]
    pub max_authorization_attempts: Option<usize>,

    /// Send the photo's location to the model and write it back.
    #[arg(long, env = "USE_LOCATION")]
    pub use_location: bool,

    /// Analyze and save results without modifying any photo.
    #[arg(long, env = "DRY_RUN")]
    pub dry_run: bool,

    /// OAuth verification code, skipping the interactive prompt.
    #[arg(long, env = "FLICKR_OAUTH_VERIFIER", hide_env_values = true)]
    pub verifier: Option<String>,
}

/// Contents of the optional TOML settings file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub flickr_api_key: Option<String>,
    pub flickr_api_secret: Option<String>,
    pub openai_api_key: Option<String>,
    pub album_id: Option<String>,
    pub model: Option<String>,
    pub prompt_cost_per_1k: Option<f64>,
    pub completion_cost_per_1k: Option<f64>,
    pub image_cost: Option<f64>,
    pub privacy_filter: Option<u8>,
    pub max_keywords: Option<usize>,
    pub placeholder_descriptions: Option<Vec<String>>,
    pub skip_prefixes: Option<Vec<String>>,
    pub output_path: Option<PathBuf>,
    pub credential_path: Option<PathBuf>,
    pub page_size: Option<usize>,
    pub detail: Option<String>,
    pub max_tokens: Option<u32>,
    pub max_analysis_attempts: Option<usize>,
    pub max_authorization_attempts: Option<usize>,
    pub use_location: Option<bool>,
    pub dry_run: Option<bool>,
}

impl Settings {
    /// Read `path`, or the default settings file when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self, AutotaggerError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_SETTINGS_FILE);
                if !default.exists() {
                    debug!("no settings file found");
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|error| {
            AutotaggerError::Config(format!("Cannot read {}: {error}", path.display()))
        })?;
        let settings = toml::from_str(&content)?;
        info!(path = %path.display(), "loaded settings file");
        Ok(settings)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub flickr_api_key: String,
    pub flickr_api_secret: String,
    pub openai_api_key: String,
    pub album_id: Option<String>,
    pub model: String,
    pub pricing: LanguageModelPricing,
    pub privacy_filter: PrivacyFilter,
    pub max_keywords: usize,
    pub placeholder_descriptions: Vec<String>,
    pub skip_prefixes: Vec<String>,
    pub output_path: PathBuf,
    pub credential_path: PathBuf,
    pub credential: Option<String>,
    pub page_size: usize,
    pub detail: ImageDetail,
    pub max_tokens: u32,
    pub max_analysis_attempts: usize,
    pub max_authorization_attempts: usize,
    pub use_location: bool,
    pub dry_run: bool,
    pub verifier: Option<String>,
}

impl Config {
    /// Resolve the configuration from parsed arguments and the settings file
    /// they point to.
    pub fn resolve(args: Args) -> Result<Self, AutotaggerError> {
        let settings = Settings::load(args.settings.as_deref())?;
        Self::from_parts(args, settings)
    }

    pub fn from_parts(args: Args, settings: Settings) -> Result<Self, AutotaggerError> {
        let flickr_api_key = non_empty(args.flickr_api_key.or(settings.flickr_api_key));
        let flickr_api_secret = non_empty(args.flickr_api_secret.or(settings.flickr_api_secret));
        let openai_api_key = non_empty(args.openai_api_key.or(settings.openai_api_key));

        let (Some(flickr_api_key), Some(flickr_api_secret), Some(openai_api_key)) =
            (flickr_api_key, flickr_api_secret, openai_api_key)
        else {
            return Err(AutotaggerError::Config(
                "Please set the required environment variables: \
                 FLICKR_API_KEY, FLICKR_API_SECRET, OPENAI_API_KEY"
                    .to_string(),
            ));
        };

        let placeholder_descriptions = match args.placeholder_descriptions {
            Some(raw) => parse_list(&raw)?,
            None => settings.placeholder_descriptions.unwrap_or_else(|| {
                DEFAULT_PLACEHOLDER_DESCRIPTIONS
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            }),
        };
        let skip_prefixes = match args.skip_prefixes {
            Some(raw) => parse_list(&raw)?,
            None => settings.skip_prefixes.unwrap_or_default(),
        };

        let privacy_filter = PrivacyFilter::try_from(
            args.privacy_filter
                .or(settings.privacy_filter)
                .unwrap_or(1),
        )
        .map_err(AutotaggerError::Config)?;

        let detail = match args.detail.or(settings.detail) {
            Some(raw) => raw.parse().map_err(AutotaggerError::Config)?,
            None => ImageDetail::High,
        };

        let pricing = LanguageModelPricing {
            input_cost_per_1k_tokens: non_negative(
                "prompt_cost_per_1k",
                args.prompt_cost_per_1k
                    .or(settings.prompt_cost_per_1k)
                    .unwrap_or(DEFAULT_PROMPT_COST_PER_1K),
            )?,
            output_cost_per_1k_tokens: non_negative(
                "completion_cost_per_1k",
                args.completion_cost_per_1k
                    .or(settings.completion_cost_per_1k)
                    .unwrap_or(DEFAULT_COMPLETION_COST_PER_1K),
            )?,
            cost_per_image: non_negative(
                "image_cost",
                args.image_cost.or(settings.image_cost).unwrap_or(0.0),
            )?,
        };

        let page_size = args
            .page_size
            .or(settings.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AutotaggerError::Config(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }

        Ok(Self {
            flickr_api_key,
            flickr_api_secret,
            openai_api_key,
            album_id: non_empty(args.album_id.or(settings.album_id)),
            model: non_empty(args.model.or(settings.model))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            pricing,
            privacy_filter,
            max_keywords: at_least_one(
                "max_keywords",
                args.max_keywords
                    .or(settings.max_keywords)
                    .unwrap_or(DEFAULT_MAX_KEYWORDS),
            )?,
            placeholder_descriptions,
            skip_prefixes,
            output_path: args
                .output_path
                .or(settings.output_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
            credential_path: args
                .credential_path
                .or(settings.credential_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIAL_PATH)),
            credential: non_empty(args.credential),
            page_size,
            detail,
            max_tokens: args
                .max_tokens
                .or(settings.max_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS),
            max_analysis_attempts: at_least_one(
                "max_analysis_attempts",
                args.max_analysis_attempts
                    .or(settings.max_analysis_attempts)
                    .unwrap_or(DEFAULT_MAX_ANALYSIS_ATTEMPTS),
            )?,
            max_authorization_attempts: at_least_one(
                "max_authorization_attempts",
                args.max_authorization_attempts
                    .or(settings.max_authorization_attempts)
                    .unwrap_or(DEFAULT_MAX_AUTHORIZATION_ATTEMPTS),
            )?,
            use_location: args.use_location || settings.use_location.unwrap_or(false),
            dry_run: args.dry_run || settings.dry_run.unwrap_or(false),
            verifier: non_empty(args.verifier),
        })
    }

    #[must_use]
    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            max_keywords: self.max_keywords,
            detail: self.detail,
            max_tokens: self.max_tokens,
            max_attempts: self.max_analysis_attempts,
            pricing: self.pricing,
        }
    }

    #[must_use]
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            album_id: self.album_id.clone(),
            skip_prefixes: self.skip_prefixes.clone(),
            placeholder_descriptions: self.placeholder_descriptions.clone(),
            privacy_filter: self.privacy_filter,
            page_size: self.page_size,
            use_location: self.use_location,
            dry_run: self.dry_run,
            output_path: self.output_path.clone(),
        }
    }
}

/// Parse a list setting: a JSON array of strings when the value starts with
/// `[`, otherwise a comma separated list. Items are trimmed; empty items are
/// dropped.
pub fn parse_list(raw: &str) -> Result<Vec<String>, AutotaggerError> {
    let raw = raw.trim();
    let items: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str(raw).map_err(|error| {
            AutotaggerError::Config(format!("Invalid list {raw}: {error}"))
        })?
    } else {
        raw.split(',').map(str::to_string).collect()
    };

    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn at_least_one(name: &str, value: usize) -> Result<usize, AutotaggerError> {
    if value == 0 {
        return Err(AutotaggerError::Config(format!(
            "{name} must be at least 1"
        )));
    }
    Ok(value)
}

fn non_negative(name: &str, value: f64) -> Result<f64, AutotaggerError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AutotaggerError::Config(format!(
            "{name} must be a non-negative number, got {value}"
        )));
    }
    Ok(value)
}
