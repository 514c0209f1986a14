//! Signature placements: where a signature goes and what it looks like.

use crate::{DocumentId, Error, PlacementId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the box a drawn signature is scaled into.
pub const IMAGE_WIDTH: f64 = 200.0;
/// Height of the box a drawn signature is scaled into.
pub const IMAGE_HEIGHT: f64 = 100.0;
/// Font size of typed signatures.
pub const TEXT_FONT_SIZE: f64 = 20.0;

const DATA_URI_IMAGE_PREFIX: &str = "data:image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementStatus {
    Pending,
    Signed,
}

/// What a placement renders.
///
/// On the wire both variants travel in one string: typed signatures as plain
/// text, drawn signatures as a `data:image/<type>;base64,<payload>` URI.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlacementContent {
    Text(String),
    Image { media_type: String, data: Vec<u8> },
}

impl PlacementContent {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        if !raw.starts_with(DATA_URI_IMAGE_PREFIX) {
            if raw.trim().is_empty() {
                return Err(Error::Validation("signature text is empty".to_owned()));
            }
            return Ok(PlacementContent::Text(raw.to_owned()));
        }

        let (header, payload) = raw
            .split_once(',')
            .ok_or_else(|| Error::Validation("image data URI has no payload".to_owned()))?;
        // header = "data:image/png;base64"
        let mut parts = header["data:".len()..].split(';');
        let media_type = parts.next().unwrap_or_default().to_ascii_lowercase();
        if !parts.any(|part| part.eq_ignore_ascii_case("base64")) {
            return Err(Error::Validation(
                "image data URI must be base64 encoded".to_owned(),
            ));
        }
        let data = base64::decode(payload.trim())?;
        if data.is_empty() {
            return Err(Error::Validation("image payload is empty".to_owned()));
        }
        Ok(PlacementContent::Image { media_type, data })
    }

    pub fn to_wire(&self) -> String {
        match self {
            PlacementContent::Text(text) => text.clone(),
            PlacementContent::Image { media_type, data } => {
                format!("data:{};base64,{}", media_type, base64::encode(data))
            }
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, PlacementContent::Image { .. })
    }
}

impl TryFrom<String> for PlacementContent {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        PlacementContent::parse(&raw)
    }
}

impl From<PlacementContent> for String {
    fn from(content: PlacementContent) -> Self {
        content.to_wire()
    }
}

// Image payloads can be large, keep them out of logs.
impl fmt::Debug for PlacementContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementContent::Text(text) => f.debug_tuple("Text").field(text).finish(),
            PlacementContent::Image { media_type, data } => f
                .debug_struct("Image")
                .field("media_type", media_type)
                .field("bytes", &data.len())
                .finish(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignaturePlacement {
    pub id: PlacementId,
    pub document_id: DocumentId,
    pub user_id: UserId,
    /// 1-indexed page number.
    pub page: u32,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "signature_text")]
    pub content: PlacementContent,
    pub status: PlacementStatus,
}

#[derive(Debug, Clone)]
pub struct NewPlacement {
    pub document_id: DocumentId,
    pub user_id: UserId,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub content: PlacementContent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_text() {
        assert_eq!(
            PlacementContent::parse("Alice").unwrap(),
            PlacementContent::Text("Alice".to_owned())
        );
    }

    #[test]
    fn data_uri_is_image() {
        let content = PlacementContent::parse("data:image/png;base64,AQID").unwrap();
        assert_eq!(
            content,
            PlacementContent::Image {
                media_type: "image/png".to_owned(),
                data: vec![1, 2, 3],
            }
        );
        assert_eq!(content.to_wire(), "data:image/png;base64,AQID");
    }

    #[test]
    fn broken_data_uris_are_rejected() {
        assert!(matches!(
            PlacementContent::parse("data:image/png;base64"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            PlacementContent::parse("data:image/png,AQID"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            PlacementContent::parse("data:image/png;base64,%%%"),
            Err(Error::Base64(_))
        ));
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(matches!(
            PlacementContent::parse("   "),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn placement_serializes_content_as_signature_text() {
        let placement = SignaturePlacement {
            id: 1,
            document_id: 2,
            user_id: 3,
            page: 1,
            x: 50.0,
            y: 700.0,
            content: PlacementContent::Text("Alice".to_owned()),
            status: PlacementStatus::Pending,
        };
        let json = serde_json::to_value(&placement).unwrap();
        assert_eq!(json["signature_text"], "Alice");
        assert_eq!(json["status"], "pending");

        let back: SignaturePlacement = serde_json::from_value(json).unwrap();
        assert_eq!(back.content, placement.content);
    }
}
