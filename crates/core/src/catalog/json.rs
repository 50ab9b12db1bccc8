//! JSON-file-backed title catalog (`movies.json`).

use std::path::Path;

use chrono::Utc;
use tracing::info;

use super::{
    CatalogError, CatalogStats, CategoryFilter, CategoryPage, FileVariant, NewTitle,
    TitleCatalog, TitleCollection, TitleRecord,
};
use crate::metrics::CATALOG_MUTATIONS;
use crate::storage::{Change, JsonCollection};

/// Title catalog persisted as a single JSON document.
pub struct JsonCatalog {
    collection: JsonCollection<TitleCollection>,
}

impl JsonCatalog {
    /// Open (or create) the catalog file at `path`.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        Ok(Self {
            collection: JsonCollection::open(path)?,
        })
    }

    /// Collect matches in storage order, stopping after `limit` hits.
    fn scan(
        &self,
        limit: usize,
        matches: impl Fn(&TitleRecord) -> bool,
    ) -> Result<Vec<TitleRecord>, CatalogError> {
        let results = self.collection.read(|c| {
            c.movies
                .values()
                .filter(|record| matches(record))
                .take(limit)
                .cloned()
                .collect()
        })?;
        Ok(results)
    }
}

/// Drop repeated tags, keeping the first occurrence of each.
fn dedup_preserving_order(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

fn first_char_lower(s: &str) -> Option<char> {
    s.chars().next().and_then(|c| c.to_lowercase().next())
}

impl TitleCatalog for JsonCatalog {
    fn add_title(&self, title: NewTitle) -> Result<u64, CatalogError> {
        let id = self.collection.write(|c| {
            let id = c.next_id;
            let record = TitleRecord {
                id,
                title: title.title,
                release_year: title.release_year,
                runtime: title.runtime,
                rating: title.rating,
                categories: dedup_preserving_order(title.categories),
                languages: dedup_preserving_order(title.languages),
                files: title.files,
                is_series: title.is_series,
                thumbnail_file_id: title.thumbnail_file_id,
                uploader_id: title.uploader_id,
                created_at: Utc::now(),
                download_count: 0,
            };
            c.movies.insert(id, record);
            c.next_id += 1;
            Change::Persist(id)
        })?;

        CATALOG_MUTATIONS.with_label_values(&["added"]).inc();
        info!("Added new title: {}", id);
        Ok(id)
    }

    fn get_title(&self, id: u64) -> Result<Option<TitleRecord>, CatalogError> {
        Ok(self.collection.read(|c| c.movies.get(&id).cloned())?)
    }

    fn search_by_substring(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<TitleRecord>, CatalogError> {
        let needle = query.to_lowercase();
        self.scan(limit, |record| record.title.to_lowercase().contains(&needle))
    }

    fn search_by_first_letter(
        &self,
        letter: char,
        limit: usize,
    ) -> Result<Vec<TitleRecord>, CatalogError> {
        let wanted = letter.to_lowercase().next();
        self.scan(limit, |record| {
            let first = first_char_lower(&record.title);
            first.is_some() && first == wanted
        })
    }

    fn search_by_category(
        &self,
        filter: &CategoryFilter,
        limit: usize,
        offset: usize,
    ) -> Result<CategoryPage, CatalogError> {
        let mut matching: Vec<TitleRecord> = self.collection.read(|c| {
            c.movies
                .values()
                .filter(|record| match filter {
                    CategoryFilter::All => true,
                    CategoryFilter::Named(name) => record.categories.iter().any(|c| c == name),
                })
                .cloned()
                .collect()
        })?;

        // Stable sort: equal titles keep id order, so pages never shuffle.
        matching.sort_by_cached_key(|record| record.title.to_lowercase());

        let total = matching.len();
        let titles: Vec<TitleRecord> = matching.into_iter().skip(offset).take(limit).collect();
        let has_more = offset.saturating_add(limit) < total;

        info!(
            "Category search for {:?}: found {} titles, returning {}",
            filter,
            total,
            titles.len()
        );

        Ok(CategoryPage {
            titles,
            total,
            has_more,
        })
    }

    fn delete_title(&self, id: u64) -> Result<bool, CatalogError> {
        let removed = self.collection.write(|c| match c.movies.remove(&id) {
            Some(_) => Change::Persist(true),
            None => Change::Discard(false),
        })?;

        if removed {
            CATALOG_MUTATIONS.with_label_values(&["deleted"]).inc();
            info!("Deleted title: {}", id);
        }
        Ok(removed)
    }

    fn increment_download_count(&self, id: u64) -> Result<bool, CatalogError> {
        Ok(self.collection.write(|c| match c.movies.get_mut(&id) {
            Some(record) => {
                record.download_count += 1;
                Change::Persist(true)
            }
            None => Change::Discard(false),
        })?)
    }

    fn list_by_uploader(
        &self,
        uploader_id: i64,
        limit: usize,
    ) -> Result<Vec<TitleRecord>, CatalogError> {
        let mut titles: Vec<TitleRecord> = self.collection.read(|c| {
            c.movies
                .values()
                .filter(|record| record.uploader_id == uploader_id)
                .cloned()
                .collect()
        })?;

        titles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        titles.truncate(limit);
        Ok(titles)
    }

    fn update_file(
        &self,
        id: u64,
        quality: &str,
        variant: FileVariant,
    ) -> Result<bool, CatalogError> {
        let updated = self.collection.write(|c| match c.movies.get_mut(&id) {
            Some(record) => {
                record.files.insert(quality.to_string(), variant);
                Change::Persist(true)
            }
            None => Change::Discard(false),
        })?;

        if updated {
            CATALOG_MUTATIONS.with_label_values(&["file_updated"]).inc();
            info!("Updated file for title {} quality {}", id, quality);
        }
        Ok(updated)
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        Ok(self.collection.read(|c| CatalogStats {
            total_titles: c.movies.len() as u64,
            total_series: c.movies.values().filter(|r| r.is_series).count() as u64,
            total_downloads: c.movies.values().map(|r| r.download_count).sum(),
        })?)
    }
}
