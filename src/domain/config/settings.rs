use std::{str::FromStr, time::Duration};

use thiserror::Error;

use crate::domain::config::secrets::{S3Secrets, Secrets};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(String),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub folder: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: 6,
            batch_delay: Duration::from_millis(200),
            folder: "originals".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub poll_interval: Duration,
    pub redirect_delay: Duration,
    pub redirect_to: String,
    /// How long a finished session stays queryable before it is evicted.
    pub session_retention: Duration,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            redirect_delay: Duration::from_millis(1500),
            redirect_to: "/jobs".to_string(),
            session_retention: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub direct_put_timeout: Duration,
    pub form_post_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            direct_put_timeout: Duration::from_secs(30),
            form_post_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub content_pipeline_url: String,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub secrets: Secrets,
    pub pipeline: PipelineSettings,
    pub completion: CompletionSettings,
    pub transport: TransportSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the settings from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::Missing(key.to_string()));

        let service_secret = require("SERVICE_SECRET")?;
        let content_pipeline_url = require("CONTENT_PIPELINE_URL")?
            .trim_end_matches('/')
            .to_string();

        let s3_secrets = match get("S3_BUCKET") {
            Some(bucket_name) => Some(S3Secrets {
                endpoint: get("S3_ENDPOINT"),
                region: get("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key_id: require("S3_ACCESS_KEY_ID")?,
                secret_access_key: require("S3_SECRET_ACCESS_KEY")?,
                bucket_name,
            }),
            None => None,
        };

        let defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            batch_size: parse_or(&get, "UPLOAD_BATCH_SIZE", defaults.batch_size)?,
            batch_delay: Duration::from_millis(parse_or(
                &get,
                "UPLOAD_BATCH_DELAY_MS",
                defaults.batch_delay.as_millis() as u64,
            )?),
            folder: get("UPLOAD_FOLDER").unwrap_or(defaults.folder),
        };
        if pipeline.batch_size == 0 {
            return Err(ConfigError::Invalid {
                var: "UPLOAD_BATCH_SIZE".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let defaults = CompletionSettings::default();
        let completion = CompletionSettings {
            poll_interval: Duration::from_millis(parse_or(
                &get,
                "COMPLETION_POLL_MS",
                defaults.poll_interval.as_millis() as u64,
            )?),
            redirect_delay: Duration::from_millis(parse_or(
                &get,
                "COMPLETION_REDIRECT_MS",
                defaults.redirect_delay.as_millis() as u64,
            )?),
            redirect_to: get("COMPLETION_REDIRECT_TO").unwrap_or(defaults.redirect_to),
            session_retention: Duration::from_millis(parse_or(
                &get,
                "SESSION_RETENTION_MS",
                defaults.session_retention.as_millis() as u64,
            )?),
        };
        non_zero("COMPLETION_POLL_MS", completion.poll_interval)?;

        let defaults = TransportSettings::default();
        let transport = TransportSettings {
            direct_put_timeout: Duration::from_secs(parse_or(
                &get,
                "DIRECT_PUT_TIMEOUT_SECS",
                defaults.direct_put_timeout.as_secs(),
            )?),
            form_post_timeout: Duration::from_secs(parse_or(
                &get,
                "FORM_POST_TIMEOUT_SECS",
                defaults.form_post_timeout.as_secs(),
            )?),
        };
        non_zero("DIRECT_PUT_TIMEOUT_SECS", transport.direct_put_timeout)?;
        non_zero("FORM_POST_TIMEOUT_SECS", transport.form_post_timeout)?;

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        Ok(Self {
            port: parse_or(&get, "PORT", 8080)?,
            content_pipeline_url,
            cors_allowed_origins,
            secrets: Secrets {
                service_secret,
                content_pipeline_api_key: get("CONTENT_PIPELINE_API_KEY"),
                s3_secrets,
            },
            pipeline,
            completion,
            transport,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            var: key.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn non_zero(var: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::Invalid {
            var: var.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
