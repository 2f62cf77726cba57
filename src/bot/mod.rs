pub mod commands;

use self::commands::{fixed_reply, Assets, Command};
use crate::{
    app::App,
    line::{
        message::{Message, ReplyRequest},
        webhook::{Event, MessageContent, Postback, Source},
    },
    services::cwa::WEATHER_FALLBACK,
    Result,
};
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};
use tracing::{debug, error, info, trace};

const RADAR_IMAGE_URL: &str =
    "https://cwaopendata.s3.ap-northeast-1.amazonaws.com/Observation/O-A0058-003.png";
const CAMERA_NOT_CONFIGURED: &str = "尚未設定攝影機";
const GREETING: &str = "感謝你加入好友！輸入「quick_reply」試試看各種訊息類型。";
const DATETIME_POSTBACKS: [&str; 3] = ["date", "time", "datetime"];

lazy_static! {
    static ref EVENTS_RECEIVED_COUNTER: IntCounterVec = register_int_counter_vec!(
        "linebot_events_received",
        "How many webhook events were received",
        &["kind"]
    )
    .unwrap();
    static ref REPLIES_COUNTER: IntCounterVec = register_int_counter_vec!(
        "linebot_replies",
        "How many replies were attempted",
        &["result"]
    )
    .unwrap();
}

/// Handles the events of a single webhook call.
pub struct Bot {
    app: App,
    assets: Assets,
}

impl Bot {
    pub fn new(app: App, assets: Assets) -> Self {
        Self { app, assets }
    }

    /// Replies to every event, logging failures instead of returning them.
    pub async fn handle_events(&self, events: Vec<Event>) {
        for event in events {
            EVENTS_RECEIVED_COUNTER
                .with_label_values(&[event.kind()])
                .inc();
            trace!(
                "Handling {} event from {:?}",
                event.kind(),
                event.source().and_then(Source::user_id)
            );

            if let Err(err) = self.handle_event(event).await {
                REPLIES_COUNTER.with_label_values(&["error"]).inc();
                error!("Could not reply to event: {err}");
            }
        }
    }

    async fn handle_event(&self, event: Event) -> Result<()> {
        let Some((reply_token, messages)) = self.reply_for(event).await else {
            return Ok(());
        };
        if messages.is_empty() {
            return Ok(());
        }

        self.app
            .line
            .reply(&ReplyRequest::new(reply_token, messages))
            .await?;
        REPLIES_COUNTER.with_label_values(&["ok"]).inc();

        Ok(())
    }

    /// The reply token and messages an event should be answered with, if any.
    pub async fn reply_for(&self, event: Event) -> Option<(String, Vec<Message>)> {
        match event {
            Event::Message {
                reply_token: Some(reply_token),
                source,
                message,
                ..
            } => {
                let messages = match message {
                    MessageContent::Text { text, .. } => {
                        let user_id = source.as_ref().and_then(Source::user_id);
                        self.reply_to_text(&text, user_id).await
                    }
                    MessageContent::Location { address, .. } => {
                        self.reply_to_location(address.as_deref()).await
                    }
                    other => {
                        trace!("Ignoring message {other:?}");
                        return None;
                    }
                };
                Some((reply_token, messages))
            }
            Event::Postback {
                reply_token: Some(reply_token),
                postback,
                ..
            } => reply_to_postback(postback).map(|messages| (reply_token, messages)),
            Event::Follow {
                reply_token: Some(reply_token),
                source,
            } => {
                info!(
                    "Followed by {}",
                    source.as_ref().and_then(Source::user_id).unwrap_or("unknown user")
                );
                Some((reply_token, vec![Message::text(GREETING)]))
            }
            Event::Unfollow { source } => {
                info!(
                    "Unfollowed by {}",
                    source.as_ref().and_then(Source::user_id).unwrap_or("unknown user")
                );
                None
            }
            event => {
                debug!("No reply for {} event", event.kind());
                None
            }
        }
    }

    pub async fn reply_to_text(&self, text: &str, user_id: Option<&str>) -> Vec<Message> {
        let Some(command) = Command::parse(text) else {
            return self.reply_to_free_text(text, user_id).await;
        };
        debug!("Processing command {command:?}");

        if let Some(messages) = fixed_reply(command, &self.assets) {
            return messages;
        }

        match command {
            Command::Earthquake => {
                let report = self.app.cwa.earthquake().await;
                vec![Message::text(report.text), Message::image(report.image_url)]
            }
            Command::Radar => vec![Message::image(cache_busted(RADAR_IMAGE_URL))],
            Command::Camera => match &self.app.config.camera_snapshot_url {
                Some(url) => vec![Message::image(cache_busted(url))],
                None => vec![Message::text(CAMERA_NOT_CONFIGURED)],
            },
            _ => Vec::new(),
        }
    }

    async fn reply_to_free_text(&self, text: &str, user_id: Option<&str>) -> Vec<Message> {
        if let Some(nlp) = &self.app.nlp {
            let addresses = nlp
                .extract_addresses(text, user_id.unwrap_or("user"))
                .await;
            if let Some(address) = addresses.first() {
                debug!("Found address {address} in text");
                return vec![Message::text(self.app.cwa.weather(address).await)];
            }
        }

        vec![Message::text(text)]
    }

    async fn reply_to_location(&self, address: Option<&str>) -> Vec<Message> {
        let Some(address) = address else {
            debug!("Location without an address");
            return vec![Message::text(WEATHER_FALLBACK)];
        };
        vec![Message::text(self.app.cwa.weather(address).await)]
    }
}

fn reply_to_postback(postback: Postback) -> Option<Vec<Message>> {
    let Postback { data, mut params } = postback;

    if data == "postback" {
        return Some(vec![Message::text("Postback")]);
    }
    if DATETIME_POSTBACKS.contains(&data.as_str()) {
        return params
            .remove(&data)
            .map(|value| vec![Message::text(value)]);
    }

    debug!("Ignoring postback {data}");
    None
}

/// The platform caches images by url, a timestamp forces a fresh fetch.
fn cache_busted(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}t={}", Utc::now().timestamp())
}
