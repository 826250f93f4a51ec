use qrbox_core::OwnerId;
use serde::{Deserialize, Serialize};

/// Encoded renderings of a box's QR payload, produced once at creation and
/// stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QrImage {
    /// PNG raster, base64 (standard alphabet).
    pub png_base64: String,

    /// Standalone SVG document of the same symbol.
    pub svg: String,
}

/// A physical storage box.
///
/// `id`, `owner_id`, `qr_payload`, `qr_image` and `created_at` are fixed at
/// creation. Only `name`, `description`, `room`, `items` and `updated_at`
/// ever change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoxRecord {
    pub id: String,

    pub owner_id: OwnerId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,

    /// Display order is insertion order. Duplicates allowed.
    #[serde(default)]
    pub items: Vec<String>,

    /// The URL encoded in the QR symbol: `{base_url}/box/{id}`.
    pub qr_payload: String,

    pub qr_image: QrImage,

    pub created_at: String,

    pub updated_at: String,
}

/// What an anonymous scanner gets to see: no owner, QR or free-text fields.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicBox {
    pub id: String,
    pub name: String,
    pub items: Vec<String>,
    pub created_at: String,
}

impl From<BoxRecord> for PublicBox {
    fn from(record: BoxRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            items: record.items,
            created_at: record.created_at,
        }
    }
}

/// Input for creating a box.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBox {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub room: Option<String>,

    /// Free-form, one item per line.
    #[serde(default, rename = "items")]
    pub items_text: String,
}

/// Partial update. `None` or an empty string leaves the field as it is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxChanges {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub room: Option<String>,

    /// When supplied, replaces the whole item list.
    #[serde(default, rename = "items")]
    pub items_text: Option<String>,
}

/// Body of `POST /boxes/{id}/items`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddItem {
    #[serde(default)]
    pub item: String,
}

/// Response to a successful create: the record plus its SVG symbol at the
/// top level, ready to print.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBox {
    #[serde(rename = "box")]
    pub record: BoxRecord,
    pub qr_code_svg: String,
    pub message: String,
}

impl From<BoxRecord> for CreatedBox {
    fn from(record: BoxRecord) -> Self {
        Self {
            qr_code_svg: record.qr_image.svg.clone(),
            record,
            message: "box created".into(),
        }
    }
}
