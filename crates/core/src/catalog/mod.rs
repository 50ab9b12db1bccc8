//! Title catalog - movies and series with their quality variants.
//!
//! Searches by substring and by first letter are early-exit scans in storage
//! order: they return the first `limit` matches encountered, not the best
//! ones. Category listings are the exception and are sorted before slicing,
//! so pages are stable.

mod json;
mod types;

pub use json::JsonCatalog;
pub use types::*;

/// Trait for title catalog storage.
pub trait TitleCatalog: Send + Sync {
    /// Add a title, assigning the next id. Duplicate title text is allowed.
    fn add_title(&self, title: NewTitle) -> Result<u64, CatalogError>;

    /// Look up a title by id. `None` may mean it was deleted after a link
    /// pointing at it was handed out.
    fn get_title(&self, id: u64) -> Result<Option<TitleRecord>, CatalogError>;

    /// Case-insensitive substring match on the title, first `limit` hits.
    fn search_by_substring(&self, query: &str, limit: usize)
        -> Result<Vec<TitleRecord>, CatalogError>;

    /// Case-insensitive first-character match, first `limit` hits.
    fn search_by_first_letter(
        &self,
        letter: char,
        limit: usize,
    ) -> Result<Vec<TitleRecord>, CatalogError>;

    /// All matches sorted by lowercase title, then sliced to
    /// `[offset, offset + limit)`.
    fn search_by_category(
        &self,
        filter: &CategoryFilter,
        limit: usize,
        offset: usize,
    ) -> Result<CategoryPage, CatalogError>;

    /// Remove a title. Returns false if it did not exist.
    fn delete_title(&self, id: u64) -> Result<bool, CatalogError>;

    /// Bump the download counter. Missing titles are ignored; the return
    /// value says whether the title existed.
    fn increment_download_count(&self, id: u64) -> Result<bool, CatalogError>;

    /// Titles added by one uploader, newest first.
    fn list_by_uploader(
        &self,
        uploader_id: i64,
        limit: usize,
    ) -> Result<Vec<TitleRecord>, CatalogError>;

    /// Set or replace the file behind one quality label.
    /// Returns false if the title does not exist.
    fn update_file(
        &self,
        id: u64,
        quality: &str,
        variant: FileVariant,
    ) -> Result<bool, CatalogError>;

    /// Catalog-wide counters.
    fn stats(&self) -> Result<CatalogStats, CatalogError>;

    /// Statistics for a single title.
    fn title_stats(&self, id: u64) -> Result<Option<TitleStats>, CatalogError> {
        Ok(self.get_title(id)?.as_ref().map(TitleStats::from))
    }
}
