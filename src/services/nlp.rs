use crate::config::NlpConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

const API_VERSION: &str = "2023-04-01";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Conversation analysis client, used to pull address entities out of free text.
#[derive(Clone)]
pub struct NlpClient {
    http: reqwest::Client,
    config: NlpConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    kind: &'static str,
    analysis_input: AnalysisInput<'a>,
    parameters: Parameters<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisInput<'a> {
    conversation_item: ConversationItem<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationItem<'a> {
    id: String,
    participant_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters<'a> {
    project_name: &'a str,
    deployment_name: &'a str,
    verbose: bool,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    result: AnalyzeResult,
}

#[derive(Deserialize)]
struct AnalyzeResult {
    prediction: Prediction,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    top_intent: Option<String>,
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Deserialize)]
struct Entity {
    category: String,
    text: String,
}

impl NlpClient {
    pub fn new(http: reqwest::Client, config: NlpConfig) -> Self {
        Self { http, config }
    }

    /// Address entities found in `text`, empty when the service fails.
    pub async fn extract_addresses(&self, text: &str, participant_id: &str) -> Vec<String> {
        match self.analyze(text, participant_id).await {
            Ok(prediction) => {
                debug!("Top intent: {:?}", prediction.top_intent);
                prediction
                    .entities
                    .into_iter()
                    .filter(|entity| entity.category == self.config.address_category)
                    .map(|entity| entity.text)
                    .collect()
            }
            Err(err) => {
                warn!("Conversation analysis failed: {err:#}");
                Vec::new()
            }
        }
    }

    async fn analyze(&self, text: &str, participant_id: &str) -> anyhow::Result<Prediction> {
        let request = AnalyzeRequest {
            kind: "Conversation",
            analysis_input: AnalysisInput {
                conversation_item: ConversationItem {
                    id: Uuid::new_v4().to_string(),
                    participant_id,
                    text,
                },
            },
            parameters: Parameters {
                project_name: &self.config.project,
                deployment_name: &self.config.deployment,
                verbose: true,
            },
        };

        let response: AnalyzeResponse = self
            .http
            .post(format!(
                "{}/language/:analyze-conversations",
                self.config.endpoint.trim_end_matches('/')
            ))
            .query(&[("api-version", API_VERSION)])
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Could not parse conversation analysis response")?;

        Ok(response.result.prediction)
    }
}
