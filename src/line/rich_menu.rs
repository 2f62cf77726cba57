use super::client::LineClient;
use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const MENU_WIDTH: u32 = 2500;
const MENU_HEIGHTS: [u32; 2] = [1686, 843];
const MAX_AREAS: usize = 20;
const MAX_CHAT_BAR_TEXT: usize = 14;
const MAX_IMAGE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichMenu {
    pub size: Size,
    pub selected: bool,
    pub name: String,
    pub chat_bar_text: String,
    pub areas: Vec<Area>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Area {
    pub bounds: Bounds,
    // Passed through as-is, the platform validates action objects
    pub action: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RichMenu {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rich menu definition {path:?}"))?;
        let rich_menu: RichMenu =
            serde_json::from_str(&contents).context("Rich menu deserialization error")?;
        rich_menu.validate()?;

        Ok(rich_menu)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.size.width != MENU_WIDTH || !MENU_HEIGHTS.contains(&self.size.height) {
            bail!(
                "rich menu size must be {MENU_WIDTH}x{} or {MENU_WIDTH}x{}",
                MENU_HEIGHTS[0],
                MENU_HEIGHTS[1]
            );
        }
        if self.chat_bar_text.chars().count() > MAX_CHAT_BAR_TEXT {
            bail!("chat bar text is longer than {MAX_CHAT_BAR_TEXT} characters");
        }
        if self.areas.is_empty() || self.areas.len() > MAX_AREAS {
            bail!("rich menu needs between 1 and {MAX_AREAS} areas");
        }

        for (i, area) in self.areas.iter().enumerate() {
            let bounds = &area.bounds;
            let right = bounds.x.checked_add(bounds.width);
            let bottom = bounds.y.checked_add(bounds.height);
            match (right, bottom) {
                (Some(right), Some(bottom))
                    if right <= self.size.width && bottom <= self.size.height => {}
                _ => bail!("area {i} is outside of the rich menu"),
            }
        }

        Ok(())
    }
}

pub fn image_content_type(path: &Path) -> anyhow::Result<&'static str> {
    match mime_guess::from_path(path).first_raw() {
        Some(mime @ ("image/png" | "image/jpeg")) => Ok(mime),
        _ => Err(anyhow!("rich menu image must be a PNG or JPEG file")),
    }
}

pub async fn upload(
    client: &LineClient,
    definition_path: &Path,
    image_path: &Path,
    set_default: bool,
) -> anyhow::Result<String> {
    let rich_menu = RichMenu::load(definition_path)?;
    let content_type = image_content_type(image_path)?;
    let image = tokio::fs::read(image_path)
        .await
        .with_context(|| format!("Failed to read rich menu image {image_path:?}"))?;
    if image.len() > MAX_IMAGE_BYTES {
        bail!("rich menu image is larger than 1 MB");
    }

    let rich_menu_id = client.create_rich_menu(&rich_menu).await?;
    info!("Created rich menu {rich_menu_id}");

    client
        .upload_rich_menu_image(&rich_menu_id, image, content_type)
        .await?;
    info!("Uploaded image for rich menu {rich_menu_id}");

    if set_default {
        client.set_default_rich_menu(&rich_menu_id).await?;
        info!("Rich menu {rich_menu_id} is now the default");
    }

    Ok(rich_menu_id)
}
