use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: String,
    pub events: Vec<Event>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    Message {
        reply_token: Option<String>,
        source: Option<Source>,
        message: MessageContent,
    },
    #[serde(rename_all = "camelCase")]
    Postback {
        reply_token: Option<String>,
        source: Option<Source>,
        postback: Postback,
    },
    #[serde(rename_all = "camelCase")]
    Follow {
        reply_token: Option<String>,
        source: Option<Source>,
    },
    #[serde(rename_all = "camelCase")]
    Unfollow { source: Option<Source> },
    #[serde(other)]
    Unknown,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Message { .. } => "message",
            Event::Postback { .. } => "postback",
            Event::Follow { .. } => "follow",
            Event::Unfollow { .. } => "unfollow",
            Event::Unknown => "unknown",
        }
    }

    pub fn source(&self) -> Option<&Source> {
        match self {
            Event::Message { source, .. }
            | Event::Postback { source, .. }
            | Event::Follow { source, .. }
            | Event::Unfollow { source } => source.as_ref(),
            Event::Unknown => None,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Source {
    #[serde(rename_all = "camelCase")]
    User { user_id: Option<String> },
    #[serde(rename_all = "camelCase")]
    Group { user_id: Option<String> },
    #[serde(rename_all = "camelCase")]
    Room { user_id: Option<String> },
}

impl Source {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Source::User { user_id } | Source::Group { user_id } | Source::Room { user_id } => {
                user_id.as_deref()
            }
        }
    }
}

/// Only the fields the bot acts on are kept, the rest of the message is ignored.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: String },
    Location { address: Option<String> },
    Sticker,
    Image,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct Postback {
    pub data: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::{Event, MessageContent, Postback, Source, WebhookPayload};
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_text_message() {
        let data = r#"{
            "destination": "Uxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
            "events": [{
                "type": "message",
                "message": {"type": "text", "id": "14353798921116", "text": "貼圖", "quoteToken": "q3Plxr4AgKd..."},
                "webhookEventId": "01FZ74A0TDDPYRVKNK77XKC3ZR",
                "deliveryContext": {"isRedelivery": false},
                "timestamp": 1625665242211,
                "source": {"type": "user", "userId": "U80696558e1aa831..."},
                "replyToken": "757913772c4646b784d4b7ce46d12671",
                "mode": "active"
            }]
        }"#;

        let payload: WebhookPayload = serde_json::from_str(data).unwrap();
        assert_eq!(payload.events.len(), 1);
        assert_eq!(
            payload.events[0],
            Event::Message {
                reply_token: Some("757913772c4646b784d4b7ce46d12671".to_owned()),
                source: Some(Source::User {
                    user_id: Some("U80696558e1aa831...".to_owned())
                }),
                message: MessageContent::Text {
                    text: "貼圖".to_owned(),
                },
            }
        );
    }

    #[test]
    fn parse_location_message() {
        let data = r#"{
            "type": "message",
            "replyToken": "token",
            "source": {"type": "group", "groupId": "Ca56f94637c...", "userId": "U4af4980629..."},
            "timestamp": 1462629479859,
            "message": {
                "id": "325708",
                "type": "location",
                "title": "my location",
                "address": "100台灣台北市中正區重慶南路一段122號",
                "latitude": 25.04,
                "longitude": 121.51
            }
        }"#;

        let event: Event = serde_json::from_str(data).unwrap();
        assert_eq!(event.source().and_then(Source::user_id), Some("U4af4980629..."));
        match event {
            Event::Message {
                message: MessageContent::Location { address, .. },
                ..
            } => assert_eq!(address.as_deref(), Some("100台灣台北市中正區重慶南路一段122號")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn parse_postback_with_params() {
        let data = r#"{
            "type": "postback",
            "replyToken": "token",
            "source": {"type": "user", "userId": "U1"},
            "timestamp": 1462629479859,
            "postback": {"data": "date", "params": {"date": "2024-05-01"}}
        }"#;

        let event: Event = serde_json::from_str(data).unwrap();
        match event {
            Event::Postback { postback, .. } => assert_eq!(
                postback,
                Postback {
                    data: "date".to_owned(),
                    params: [("date".to_owned(), "2024-05-01".to_owned())]
                        .into_iter()
                        .collect(),
                }
            ),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn parse_sticker_and_image_messages() {
        let data = r#"{
            "destination": "U0",
            "events": [
                {"type": "message", "replyToken": "t", "timestamp": 1,
                 "message": {"type": "sticker", "id": "1", "packageId": "446", "stickerId": "1988", "stickerResourceType": "STATIC"}},
                {"type": "message", "replyToken": "t", "timestamp": 2,
                 "message": {"type": "image", "id": "2", "contentProvider": {"type": "line"}}}
            ]
        }"#;

        let payload: WebhookPayload = serde_json::from_str(data).unwrap();
        let messages: Vec<_> = payload
            .events
            .into_iter()
            .map(|event| match event {
                Event::Message { message, .. } => message,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(messages, [MessageContent::Sticker, MessageContent::Image]);
    }

    #[test]
    fn unknown_kinds_are_tolerated() {
        let data = r#"{
            "destination": "U0",
            "events": [
                {"type": "beacon", "replyToken": "t", "beacon": {"hwid": "d41d8cd98f", "type": "enter"}},
                {"type": "message", "replyToken": "t", "message": {"type": "video", "id": "1", "duration": 60000}},
                {"type": "unfollow", "source": {"type": "user", "userId": "U1"}}
            ]
        }"#;

        let payload: WebhookPayload = serde_json::from_str(data).unwrap();
        let kinds: Vec<_> = payload.events.iter().map(Event::kind).collect();
        assert_eq!(kinds, ["unknown", "message", "unfollow"]);
        assert!(matches!(
            payload.events[1],
            Event::Message {
                message: MessageContent::Unknown,
                ..
            }
        ));
    }
}
