use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash-001";
pub const DEFAULT_IMAGE_MODEL: &str = "imagegeneration@006";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub project_id: String,
    pub location: String,
    pub access_token: Option<String>,
    pub api_base: String,
    pub text_model: String,
    pub image_model: String,
    pub test_mode: bool,
    /// Key the test store by request fingerprint even in test mode.
    pub per_request_test_responses: bool,
    pub test_responses_dir: PathBuf,
    pub output_root: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let project_id = non_empty("GOOGLE_CLOUD_PROJECT").ok_or(ConfigError::Missing("GOOGLE_CLOUD_PROJECT"))?;
        let location = non_empty("GOOGLE_CLOUD_LOCATION").ok_or(ConfigError::Missing("GOOGLE_CLOUD_LOCATION"))?;
        let api_base = non_empty("VERTEX_API_BASE")
            .unwrap_or_else(|| format!("https://{location}-aiplatform.googleapis.com/v1"));

        let port = match non_empty("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { name: "PORT", value: raw })?,
            None => 8080,
        };

        Ok(Self {
            access_token: non_empty("GOOGLE_CLOUD_ACCESS_TOKEN"),
            api_base: api_base.trim_end_matches('/').to_string(),
            text_model: non_empty("TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: non_empty("IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            test_mode: non_empty("TEST_MODE").map(|v| parse_flag(&v)).unwrap_or(false),
            per_request_test_responses: non_empty("TEST_RESPONSE_PER_REQUEST").map(|v| parse_flag(&v)).unwrap_or(false),
            test_responses_dir: non_empty("TEST_RESPONSES_DIR").unwrap_or_else(|| "test_responses".into()).into(),
            output_root: non_empty("OUTPUT_ROOT").unwrap_or_else(|| ".".into()).into(),
            project_id,
            location,
            port,
        })
    }
}

pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
