use serde::Serialize;

/// The reply endpoint accepts at most five messages per token.
pub const MAX_REPLY_MESSAGES: usize = 5;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub reply_token: String,
    pub messages: Vec<Message>,
}

impl ReplyRequest {
    pub fn new(reply_token: impl Into<String>, mut messages: Vec<Message>) -> Self {
        messages.truncate(MAX_REPLY_MESSAGES);
        Self {
            reply_token: reply_token.into(),
            messages,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    #[serde(rename_all = "camelCase")]
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        emojis: Option<Vec<Emoji>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        quick_reply: Option<QuickReply>,
    },
    #[serde(rename_all = "camelCase")]
    Sticker {
        package_id: String,
        sticker_id: String,
    },
    Location {
        title: String,
        address: String,
        latitude: f64,
        longitude: f64,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        original_content_url: String,
        preview_image_url: String,
    },
    #[serde(rename_all = "camelCase")]
    Template { alt_text: String, template: Template },
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text {
            text: text.into(),
            emojis: None,
            quick_reply: None,
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        let url = url.into();
        Message::Image {
            preview_image_url: url.clone(),
            original_content_url: url,
        }
    }

    pub fn sticker(package_id: &str, sticker_id: &str) -> Self {
        Message::Sticker {
            package_id: package_id.to_owned(),
            sticker_id: sticker_id.to_owned(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Emoji {
    pub index: usize,
    pub product_id: String,
    pub emoji_id: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct QuickReply {
    pub items: Vec<QuickReplyItem>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename = "action", rename_all = "camelCase")]
pub struct QuickReplyItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub action: Action,
}

impl QuickReplyItem {
    pub fn new(action: Action) -> Self {
        Self {
            image_url: None,
            action,
        }
    }

    pub fn with_icon(action: Action, image_url: String) -> Self {
        Self {
            image_url: Some(image_url),
            action,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    #[serde(rename_all = "camelCase")]
    Postback {
        label: String,
        data: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        display_text: Option<String>,
    },
    Message {
        label: String,
        text: String,
    },
    Uri {
        label: String,
        uri: String,
    },
    #[serde(rename = "datetimepicker")]
    DatetimePicker {
        label: String,
        data: String,
        mode: DatetimeMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<String>,
    },
    Camera {
        label: String,
    },
    CameraRoll {
        label: String,
    },
    Location {
        label: String,
    },
}

impl Action {
    pub fn message(label: &str, text: &str) -> Self {
        Action::Message {
            label: label.to_owned(),
            text: text.to_owned(),
        }
    }

    pub fn postback(label: &str, data: &str) -> Self {
        Action::Postback {
            label: label.to_owned(),
            data: data.to_owned(),
            display_text: None,
        }
    }

    pub fn uri(label: &str, uri: &str) -> Self {
        Action::Uri {
            label: label.to_owned(),
            uri: uri.to_owned(),
        }
    }

    pub fn datetime_picker(label: &str, data: &str, mode: DatetimeMode) -> Self {
        Action::DatetimePicker {
            label: label.to_owned(),
            data: data.to_owned(),
            mode,
            initial: None,
            max: None,
            min: None,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DatetimeMode {
    Date,
    Time,
    Datetime,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Template {
    #[serde(rename_all = "camelCase")]
    Buttons {
        #[serde(skip_serializing_if = "Option::is_none")]
        thumbnail_image_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        text: String,
        actions: Vec<Action>,
    },
    Confirm {
        text: String,
        actions: Vec<Action>,
    },
    Carousel {
        columns: Vec<CarouselColumn>,
    },
    ImageCarousel {
        columns: Vec<ImageCarouselColumn>,
    },
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CarouselColumn {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    pub actions: Vec<Action>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageCarouselColumn {
    pub image_url: String,
    pub action: Action,
}
