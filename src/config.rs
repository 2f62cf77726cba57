use anyhow::Context;
use std::env;
use tracing::{info, warn};

const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:5000";
const DEFAULT_LINE_API_URL: &str = "https://api.line.me";
const DEFAULT_LINE_DATA_API_URL: &str = "https://api-data.line.me";
const DEFAULT_CWA_API_URL: &str = "https://opendata.cwa.gov.tw/api/v1/rest/datastore";
const DEFAULT_NLP_ADDRESS_CATEGORY: &str = "address";

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_address: String,
    pub channel_access_token: String,
    pub channel_secret: String,
    /// Base url the bot is reachable at, used for static asset links.
    /// Derived from the request host when unset.
    pub public_url: Option<String>,
    pub line_api_url: String,
    pub line_data_api_url: String,
    pub cwa_api_url: String,
    pub cwa_api_key: Option<String>,
    pub camera_snapshot_url: Option<String>,
    pub nlp: Option<NlpConfig>,
}

#[derive(Clone, Debug)]
pub struct NlpConfig {
    pub endpoint: String,
    pub key: String,
    pub project: String,
    pub deployment: String,
    pub address_category: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(err) if err.not_found() => (),
            Err(err) => return Err(err).context("Could not read .env file"),
        }

        let config = Self {
            listen_address: optional("LISTEN_ADDRESS")
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_owned()),
            channel_access_token: required("CHANNEL_ACCESS_TOKEN")?,
            channel_secret: required("CHANNEL_SECRET")?,
            public_url: optional("PUBLIC_URL"),
            line_api_url: optional("LINE_API_URL")
                .unwrap_or_else(|| DEFAULT_LINE_API_URL.to_owned()),
            line_data_api_url: optional("LINE_DATA_API_URL")
                .unwrap_or_else(|| DEFAULT_LINE_DATA_API_URL.to_owned()),
            cwa_api_url: optional("CWA_API_URL").unwrap_or_else(|| DEFAULT_CWA_API_URL.to_owned()),
            cwa_api_key: optional("CWA_API_KEY"),
            camera_snapshot_url: optional("CAMERA_SNAPSHOT_URL"),
            nlp: NlpConfig::load(),
        };

        if config.cwa_api_key.is_none() {
            warn!("CWA_API_KEY is not set, weather and earthquake lookups will fall back");
        }

        Ok(config)
    }
}

impl NlpConfig {
    fn load() -> Option<Self> {
        let endpoint = optional("NLP_ENDPOINT");
        let key = optional("NLP_KEY");
        let project = optional("NLP_PROJECT");
        let deployment = optional("NLP_DEPLOYMENT");

        match (endpoint, key, project, deployment) {
            (Some(endpoint), Some(key), Some(project), Some(deployment)) => Some(Self {
                endpoint,
                key,
                project,
                deployment,
                address_category: optional("NLP_ADDRESS_CATEGORY")
                    .unwrap_or_else(|| DEFAULT_NLP_ADDRESS_CATEGORY.to_owned()),
            }),
            (None, None, None, None) => None,
            _ => {
                warn!("NLP configuration is incomplete, address extraction is disabled");
                None
            }
        }
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    optional(name).with_context(|| format!("Missing required environment variable {name}"))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
impl Config {
    /// Points every upstream at `server_url`, NLP disabled.
    pub fn for_tests(server_url: &str) -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_owned(),
            channel_access_token: "access-token".to_owned(),
            channel_secret: "channel-secret".to_owned(),
            public_url: None,
            line_api_url: server_url.to_owned(),
            line_data_api_url: server_url.to_owned(),
            cwa_api_url: server_url.to_owned(),
            cwa_api_key: Some("cwa-key".to_owned()),
            camera_snapshot_url: None,
            nlp: None,
        }
    }
}
