/// Gallery data models
use crate::error::GalleryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decoration category a photo is filed under
///
/// The set is closed. Values read back from a backend that fall outside it
/// are folded into [`Category::Other`]; values supplied by a user are parsed
/// strictly with [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Wedding,
    Car,
    Birthday,
    Baby,
    Stage,
    Housewarming,
    Corporate,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Wedding,
        Category::Car,
        Category::Birthday,
        Category::Baby,
        Category::Stage,
        Category::Housewarming,
        Category::Corporate,
        Category::Other,
    ];

    /// Wire value stored in the `category` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Wedding => "wedding",
            Category::Car => "car",
            Category::Birthday => "birthday",
            Category::Baby => "baby",
            Category::Stage => "stage",
            Category::Housewarming => "housewarming",
            Category::Corporate => "corporate",
            Category::Other => "other",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Category::Wedding => "Wedding Decoration",
            Category::Car => "Car Decoration",
            Category::Birthday => "Birthday Party",
            Category::Baby => "Baby Shower",
            Category::Stage => "Stage Decoration",
            Category::Housewarming => "Housewarming",
            Category::Corporate => "Corporate",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| GalleryError::Validation(format!("Unknown category: {}", s)))
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        value.parse().unwrap_or(Category::Other)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

/// One row of the `gallery_photos` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub image_url: String,
    pub category: Category,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub alt_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Photo {
    /// Storage key of the object behind this photo
    ///
    /// Older rows were written without `file_path`; for those the key is
    /// recovered from the public URL, which always ends in `/{bucket}/{key}`.
    pub fn object_path(&self, bucket: &str) -> Option<String> {
        if let Some(path) = self.file_path.as_deref().filter(|p| !p.is_empty()) {
            return Some(path.to_string());
        }

        let marker = format!("/{}/", bucket);
        self.image_url
            .split_once(&marker)
            .and_then(|(_, key)| urlencoding::decode(key).ok())
            .map(|key| key.into_owned())
            .filter(|key| !key.is_empty())
    }
}

/// Insert payload for a new photo row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPhoto {
    pub image_url: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// Hosted tables may use text UUIDs or bigint identity columns
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
