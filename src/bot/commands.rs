use crate::line::message::{
    Action, CarouselColumn, DatetimeMode, Emoji, ImageCarouselColumn, Message, QuickReply,
    QuickReplyItem, Template,
};
use strum::{AsRefStr, EnumIter, EnumString};

const EMOJI_PRODUCT_ID: &str = "5ac1bfd5040ab15980c9b435";

/// Fixed vocabulary, matched against the whole inbound text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, EnumIter)]
pub enum Command {
    #[strum(serialize = "文字")]
    Text,
    #[strum(serialize = "表情符號")]
    Emoji,
    #[strum(serialize = "貼圖")]
    Sticker,
    #[strum(serialize = "位置")]
    Location,
    #[strum(serialize = "圖片")]
    Image,
    #[strum(serialize = "quick_reply")]
    QuickReply,
    #[strum(serialize = "按鈕")]
    Buttons,
    #[strum(serialize = "確認")]
    Confirm,
    #[strum(serialize = "輪播")]
    Carousel,
    #[strum(serialize = "圖片輪播")]
    ImageCarousel,
    #[strum(serialize = "天氣")]
    Weather,
    #[strum(serialize = "地震")]
    Earthquake,
    #[strum(serialize = "雷達回波")]
    Radar,
    #[strum(serialize = "即時影像")]
    Camera,
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        text.parse().ok()
    }
}

/// Links to the images embedded under `/static`.
#[derive(Debug, Clone)]
pub struct Assets {
    base_url: String,
}

impl Assets {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn url(&self, name: &str) -> String {
        format!("{}/static/{name}", self.base_url)
    }
}

/// Replies that need nothing but the command itself.
/// Commands backed by an upstream lookup return `None`.
pub fn fixed_reply(command: Command, assets: &Assets) -> Option<Vec<Message>> {
    let message = match command {
        Command::Text => Message::text("這是文字訊息"),
        Command::Emoji => Message::Text {
            text: "$ LINE 表情符號 $".to_owned(),
            emojis: Some(vec![
                Emoji {
                    index: 0,
                    product_id: EMOJI_PRODUCT_ID.to_owned(),
                    emoji_id: "001".to_owned(),
                },
                Emoji {
                    index: 12,
                    product_id: EMOJI_PRODUCT_ID.to_owned(),
                    emoji_id: "002".to_owned(),
                },
            ]),
            quick_reply: None,
        },
        Command::Sticker => Message::sticker("446", "1988"),
        Command::Location => Message::Location {
            title: "台北101".to_owned(),
            address: "110台北市信義區信義路五段7號".to_owned(),
            latitude: 25.033_964,
            longitude: 121.564_472,
        },
        Command::Image => Message::image(assets.url("photo.png")),
        Command::QuickReply => Message::Text {
            text: "請選擇項目".to_owned(),
            emojis: None,
            quick_reply: Some(quick_reply(assets)),
        },
        Command::Buttons => buttons(assets),
        Command::Confirm => Message::Template {
            alt_text: "確認樣板".to_owned(),
            template: Template::Confirm {
                text: "你確定要繼續嗎？".to_owned(),
                actions: vec![Action::message("是", "是"), Action::message("否", "否")],
            },
        },
        Command::Carousel => carousel(assets),
        Command::ImageCarousel => image_carousel(assets),
        Command::Weather => Message::Text {
            text: "請傳送你的位置，我會告訴你當地的天氣".to_owned(),
            emojis: None,
            quick_reply: Some(QuickReply {
                items: vec![QuickReplyItem::new(Action::Location {
                    label: "傳送位置".to_owned(),
                })],
            }),
        },
        Command::Earthquake | Command::Radar | Command::Camera => return None,
    };

    Some(vec![message])
}

fn quick_reply(assets: &Assets) -> QuickReply {
    QuickReply {
        items: vec![
            QuickReplyItem::with_icon(
                Action::Postback {
                    label: "Postback".to_owned(),
                    data: "postback".to_owned(),
                    display_text: Some("postback".to_owned()),
                },
                assets.url("postback.png"),
            ),
            QuickReplyItem::with_icon(Action::message("Message", "message"), assets.url("message.png")),
            QuickReplyItem::with_icon(
                Action::datetime_picker("Date", "date", DatetimeMode::Date),
                assets.url("calendar.png"),
            ),
            QuickReplyItem::with_icon(
                Action::datetime_picker("Time", "time", DatetimeMode::Time),
                assets.url("time.png"),
            ),
            QuickReplyItem::with_icon(
                Action::DatetimePicker {
                    label: "Datetime".to_owned(),
                    data: "datetime".to_owned(),
                    mode: DatetimeMode::Datetime,
                    initial: Some("2024-01-01T00:00".to_owned()),
                    max: Some("2025-01-01T00:00".to_owned()),
                    min: Some("2023-01-01T00:00".to_owned()),
                },
                assets.url("calendar.png"),
            ),
            QuickReplyItem::new(Action::Camera {
                label: "Camera".to_owned(),
            }),
            QuickReplyItem::new(Action::CameraRoll {
                label: "Camera Roll".to_owned(),
            }),
            QuickReplyItem::new(Action::Location {
                label: "Location".to_owned(),
            }),
        ],
    }
}

fn buttons(assets: &Assets) -> Message {
    Message::Template {
        alt_text: "按鈕樣板".to_owned(),
        template: Template::Buttons {
            thumbnail_image_url: Some(assets.url("card.png")),
            title: Some("選單".to_owned()),
            text: "請選擇動作".to_owned(),
            actions: vec![
                Action::postback("回傳值", "postback"),
                Action::message("傳送訊息", "文字"),
                Action::uri("開啟網頁", "https://developers.line.biz/"),
                Action::datetime_picker("選擇日期", "date", DatetimeMode::Date),
            ],
        },
    }
}

fn carousel(assets: &Assets) -> Message {
    let column = |title: &str, text: &str, command: &str| CarouselColumn {
        thumbnail_image_url: Some(assets.url("card.png")),
        title: Some(title.to_owned()),
        text: text.to_owned(),
        actions: vec![
            Action::message(title, command),
            Action::uri("說明文件", "https://developers.line.biz/en/docs/messaging-api/"),
        ],
    };

    Message::Template {
        alt_text: "輪播樣板".to_owned(),
        template: Template::Carousel {
            columns: vec![
                column("天氣", "查詢所在地天氣", "天氣"),
                column("地震", "最新地震報告", "地震"),
                column("雷達回波", "即時雷達回波圖", "雷達回波"),
            ],
        },
    }
}

fn image_carousel(assets: &Assets) -> Message {
    Message::Template {
        alt_text: "圖片輪播樣板".to_owned(),
        template: Template::ImageCarousel {
            columns: vec![
                ImageCarouselColumn {
                    image_url: assets.url("photo.png"),
                    action: Action::message("圖片", "圖片"),
                },
                ImageCarouselColumn {
                    image_url: assets.url("card.png"),
                    action: Action::postback("Postback", "postback"),
                },
            ],
        },
    }
}
