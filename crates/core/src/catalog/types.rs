//! Types for the title catalog.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

/// Reference to a file hosted by the messaging platform.
///
/// Resolved to a single handle when it enters the catalog: older records
/// stored a bare string or a `[file_id, unique_id]` pair, and both collapse
/// into this one shape at deserialization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFileVariant")]
pub struct FileVariant {
    /// Opaque platform file handle, used to send the file.
    pub file_id: String,
    /// Secondary identity hash of the same file, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
}

impl FileVariant {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            unique_id: None,
        }
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }
}

/// Shapes a file reference may take on disk or on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFileVariant {
    Handle(String),
    Handles(Vec<String>),
    Detailed {
        file_id: String,
        #[serde(default)]
        unique_id: Option<String>,
    },
}

impl TryFrom<RawFileVariant> for FileVariant {
    type Error = String;

    fn try_from(raw: RawFileVariant) -> Result<Self, Self::Error> {
        match raw {
            RawFileVariant::Handle(file_id) => Ok(FileVariant::new(file_id)),
            RawFileVariant::Handles(handles) => {
                let mut handles = handles.into_iter();
                let file_id = handles
                    .next()
                    .ok_or_else(|| "file handle list is empty".to_string())?;
                Ok(FileVariant {
                    file_id,
                    unique_id: handles.next(),
                })
            }
            RawFileVariant::Detailed { file_id, unique_id } => Ok(FileVariant { file_id, unique_id }),
        }
    }
}

/// One catalog entry: a movie or a series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleRecord {
    #[serde(rename = "movie_id")]
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub release_year: String,
    #[serde(default)]
    pub runtime: String,
    #[serde(default, rename = "imdb_rating")]
    pub rating: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    /// Quality label ("720p", "E01", ...) to file.
    #[serde(default)]
    pub files: BTreeMap<String, FileVariant>,
    #[serde(default)]
    pub is_series: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_file_id: Option<String>,
    #[serde(rename = "added_by")]
    pub uploader_id: i64,
    #[serde(
        rename = "added_at",
        deserialize_with = "crate::storage::timestamp::deserialize"
    )]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub download_count: u64,
}

impl TitleRecord {
    /// Quality labels in display order.
    pub fn qualities(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

/// Input for [`super::TitleCatalog::add_title`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTitle {
    pub title: String,
    #[serde(default)]
    pub release_year: String,
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub files: BTreeMap<String, FileVariant>,
    #[serde(default)]
    pub is_series: bool,
    #[serde(default)]
    pub thumbnail_file_id: Option<String>,
    pub uploader_id: i64,
}

/// On-disk layout of `movies.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleCollection {
    pub next_id: u64,
    /// Keyed by id, so iteration order is insertion order.
    pub movies: BTreeMap<u64, TitleRecord>,
}

impl Default for TitleCollection {
    fn default() -> Self {
        Self {
            next_id: 1,
            movies: BTreeMap::new(),
        }
    }
}

/// Which titles a category listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Every title in the catalog.
    All,
    /// Titles tagged with exactly this category.
    Named(String),
}

/// One page of a category listing.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryPage {
    pub titles: Vec<TitleRecord>,
    /// Number of matching titles across all pages.
    pub total: usize,
    pub has_more: bool,
}

/// Catalog-wide counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogStats {
    pub total_titles: u64,
    pub total_series: u64,
    pub total_downloads: u64,
}

/// Per-title statistics shown to admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleStats {
    pub id: u64,
    pub title: String,
    pub added_at: DateTime<Utc>,
    pub added_by: i64,
    pub download_count: u64,
    pub qualities: Vec<String>,
    pub languages: Vec<String>,
    pub categories: Vec<String>,
}

impl From<&TitleRecord> for TitleStats {
    fn from(record: &TitleRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            added_at: record.created_at,
            added_by: record.uploader_id,
            download_count: record.download_count,
            qualities: record.qualities(),
            languages: record.languages.clone(),
            categories: record.categories.clone(),
        }
    }
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_variant_from_bare_handle() {
        let variant: FileVariant = serde_json::from_str(r#""BQACAgUAAx""#).unwrap();
        assert_eq!(variant, FileVariant::new("BQACAgUAAx"));
    }

    #[test]
    fn test_file_variant_from_pair_takes_first_handle() {
        let variant: FileVariant = serde_json::from_str(r#"["fileA", "uniqA"]"#).unwrap();
        assert_eq!(variant.file_id, "fileA");
        assert_eq!(variant.unique_id.as_deref(), Some("uniqA"));
    }

    #[test]
    fn test_file_variant_from_single_element_list() {
        let variant: FileVariant = serde_json::from_str(r#"["fileA"]"#).unwrap();
        assert_eq!(variant, FileVariant::new("fileA"));
    }

    #[test]
    fn test_file_variant_from_empty_list_fails() {
        let result: Result<FileVariant, _> = serde_json::from_str("[]");
        assert!(result.is_err());
    }

    #[test]
    fn test_file_variant_serializes_as_object() {
        let json = serde_json::to_string(&FileVariant::new("fileA")).unwrap();
        assert_eq!(json, r#"{"file_id":"fileA"}"#);

        let back: FileVariant = serde_json::from_str(&json).unwrap();
        assert_eq!(back.file_id, "fileA");
    }

    #[test]
    fn test_title_collection_layout() {
        let mut collection = TitleCollection::default();
        collection.movies.insert(
            7,
            TitleRecord {
                id: 7,
                title: "Jawan".to_string(),
                release_year: "2023".to_string(),
                runtime: "2h 49m".to_string(),
                rating: "7.0".to_string(),
                categories: vec!["🎬 Bollywood".to_string()],
                languages: vec!["Hindi".to_string()],
                files: BTreeMap::from([("720p".to_string(), FileVariant::new("fileA"))]),
                is_series: false,
                thumbnail_file_id: None,
                uploader_id: 42,
                created_at: Utc::now(),
                download_count: 0,
            },
        );

        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(value["next_id"], 1);
        assert_eq!(value["movies"]["7"]["movie_id"], 7);
        assert_eq!(value["movies"]["7"]["added_by"], 42);
        assert_eq!(value["movies"]["7"]["files"]["720p"]["file_id"], "fileA");
        assert!(value["movies"]["7"].get("thumbnail_file_id").is_none());
    }

    #[test]
    fn test_legacy_record_with_pair_files() {
        let json = r#"{
            "movie_id": 3,
            "title": "Kalki",
            "files": { "1080p": ["fileX", "uniqX"], "480p": "fileY" },
            "added_by": 5,
            "added_at": "2024-06-01T10:00:00.123456"
        }"#;

        let record: TitleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.files["1080p"].file_id, "fileX");
        assert_eq!(record.files["480p"].file_id, "fileY");
        assert_eq!(record.download_count, 0);
        assert_eq!(record.qualities(), vec!["1080p", "480p"]);
    }
}
