//! Card data model for the board.
//!
//! A card is a positioned, selectable rectangle that carries an image, a
//! text body, or both. The board itself is just an ordered `Vec` of cards —
//! insertion order breaks `z_index` ties.
//!
//! Field names serialize in camelCase (`zIndex`, `isSelected`, `imageSrc`)
//! because that is the shape the UI layer exchanges.

use crate::geometry::{Bounds, Point, Size};
use crate::id::CardId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open auxiliary data attached to a card by tools (cached analysis etc.).
/// The core never interprets it, only carries it along.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A single card on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasItem {
    pub id: CardId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub z_index: i64,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl CanvasItem {
    pub fn new(id: CardId, x: f32, y: f32, width: f32, height: f32, z_index: i64) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
            z_index,
            is_selected: false,
            title: None,
            body: None,
            image_src: None,
            image_prompt: None,
            metadata: Metadata::new(),
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    pub fn is_image_card(&self) -> bool {
        self.image_src.is_some() || self.image_prompt.is_some()
    }

    pub fn is_text_card(&self) -> bool {
        self.body.is_some()
    }

    pub fn moved_to(&self, at: Point) -> Self {
        Self {
            x: at.x,
            y: at.y,
            ..self.clone()
        }
    }
}

/// Everything needed to create a card except identity, position and stacking.
/// Tools build a draft; the store assigns the rest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CardDraft {
    pub size: Size,
    pub title: Option<String>,
    pub body: Option<String>,
    pub image_src: Option<String>,
    pub image_prompt: Option<String>,
    pub metadata: Metadata,
    /// Whether the new card should replace the current selection.
    pub select: bool,
}

impl CardDraft {
    pub fn image(src: impl Into<String>, size: Size) -> Self {
        Self {
            size,
            image_src: Some(src.into()),
            ..Self::default()
        }
    }

    pub fn text(body: impl Into<String>, size: Size) -> Self {
        Self {
            size,
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.image_prompt = Some(prompt.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn selected(mut self) -> Self {
        self.select = true;
        self
    }

    /// Top-left corner that puts this draft's center on `center`.
    pub fn top_left_for_center(&self, center: Point) -> Point {
        center.offset(-self.size.width / 2.0, -self.size.height / 2.0)
    }

    pub fn into_item(self, id: CardId, top_left: Point, z_index: i64) -> CanvasItem {
        CanvasItem {
            id,
            x: top_left.x,
            y: top_left.y,
            width: self.size.width,
            height: self.size.height,
            z_index,
            is_selected: self.select,
            title: self.title,
            body: self.body,
            image_src: self.image_src,
            image_prompt: self.image_prompt,
            metadata: self.metadata,
        }
    }
}
