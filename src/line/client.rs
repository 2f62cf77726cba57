use super::{message::ReplyRequest, rich_menu::RichMenu};
use crate::{error::Error, Result};
use reqwest::{header, Response};
use serde::Deserialize;
use tracing::debug;

#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    access_token: String,
    api_url: String,
    data_api_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RichMenuIdResponse {
    rich_menu_id: String,
}

impl LineClient {
    pub fn new(
        http: reqwest::Client,
        access_token: String,
        api_url: &str,
        data_api_url: &str,
    ) -> Self {
        Self {
            http,
            access_token,
            api_url: api_url.trim_end_matches('/').to_owned(),
            data_api_url: data_api_url.trim_end_matches('/').to_owned(),
        }
    }

    pub async fn reply(&self, request: &ReplyRequest) -> Result<()> {
        debug!(
            "Replying with {} message(s) to token {}",
            request.messages.len(),
            request.reply_token
        );

        let response = self
            .http
            .post(format!("{}/v2/bot/message/reply", self.api_url))
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }

    pub async fn create_rich_menu(&self, rich_menu: &RichMenu) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/v2/bot/richmenu", self.api_url))
            .bearer_auth(&self.access_token)
            .json(rich_menu)
            .send()
            .await?;
        let body: RichMenuIdResponse = check_status(response).await?.json().await?;

        Ok(body.rich_menu_id)
    }

    pub async fn upload_rich_menu_image(
        &self,
        rich_menu_id: &str,
        image: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let response = self
            .http
            .post(format!(
                "{}/v2/bot/richmenu/{rich_menu_id}/content",
                self.data_api_url
            ))
            .bearer_auth(&self.access_token)
            .header(header::CONTENT_TYPE, content_type)
            .body(image)
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }

    pub async fn set_default_rich_menu(&self, rich_menu_id: &str) -> Result<()> {
        let response = self
            .http
            .post(format!(
                "{}/v2/bot/user/all/richmenu/{rich_menu_id}",
                self.api_url
            ))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(Error::LineApi { status, body })
    }
}
