pub mod notices;

use log::info;
use url::Url;

use crate::cli::Args;
use crate::error::ClientError;

pub const PRODUCTION_DJANGO_URL: &str = "https://chatbot-production-848e.up.railway.app/api/v1";
pub const LOCAL_DJANGO_URL: &str = "http://localhost:8000/api/v1";
pub const LOCAL_FASTAPI_URL: &str = "http://localhost:8080";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl CompletionSettings {
    /// Ranges mirror what the completion service accepts.
    pub fn new(temperature: f32, max_tokens: u32) -> Result<Self, ClientError> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(
                ClientError::InvalidConfig(
                    format!("temperature must be between 0.0 and 2.0, got {}", temperature)
                )
            );
        }
        if !(100..=4000).contains(&max_tokens) {
            return Err(
                ClientError::InvalidConfig(
                    format!("max tokens must be between 100 and 4000, got {}", max_tokens)
                )
            );
        }
        Ok(Self { temperature, max_tokens })
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub django_api_url: Url,
    pub fastapi_url: Url,
    pub completion: CompletionSettings,
}

fn parse_endpoint(name: &str, raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|e|
        ClientError::InvalidConfig(format!("{} '{}' is not a valid URL: {}", name, raw, e))
    )?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClientError::InvalidConfig(format!("{} must use http(s), got '{}'", name, other))),
    }
}

impl ClientConfig {
    /// Explicit endpoints win; otherwise production selects the hosted REST
    /// API and everything else falls back to local development servers.
    pub fn from_args(args: &Args) -> Result<Self, ClientError> {
        let django_raw = match (&args.django_api_url, args.production) {
            (Some(url), _) => url.as_str(),
            (None, true) => PRODUCTION_DJANGO_URL,
            (None, false) => LOCAL_DJANGO_URL,
        };
        let fastapi_raw = match (&args.fastapi_url, args.production) {
            (Some(url), _) => url.as_str(),
            (None, true) => {
                return Err(
                    ClientError::InvalidConfig(
                        "FASTAPI_URL must be set when running against production".to_string()
                    )
                );
            }
            (None, false) => LOCAL_FASTAPI_URL,
        };

        let config = Self {
            django_api_url: parse_endpoint("DJANGO_API_URL", django_raw)?,
            fastapi_url: parse_endpoint("FASTAPI_URL", fastapi_raw)?,
            completion: CompletionSettings::new(args.temperature, args.max_tokens)?,
        };
        info!(
            "Endpoints resolved: rest={}, completion={} ({})",
            config.django_api_url,
            config.fastapi_url,
            if args.production { "production" } else { "development" }
        );
        Ok(config)
    }
}
