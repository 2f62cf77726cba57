use crate::{
    config::Config,
    line::LineClient,
    services::{CwaClient, NlpClient},
};
use std::{sync::Arc, time::Duration};

const HTTP_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone)]
pub struct App {
    pub config: Arc<Config>,
    pub line: LineClient,
    pub cwa: CwaClient,
    pub nlp: Option<NlpClient>,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECONDS))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let line = LineClient::new(
            http.clone(),
            config.channel_access_token.clone(),
            &config.line_api_url,
            &config.line_data_api_url,
        );
        let cwa = CwaClient::new(http.clone(), &config.cwa_api_url, config.cwa_api_key.clone());
        let nlp = config
            .nlp
            .clone()
            .map(|nlp_config| NlpClient::new(http, nlp_config));

        Ok(Self {
            config: Arc::new(config),
            line,
            cwa,
            nlp,
        })
    }
}
