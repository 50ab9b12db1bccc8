//! Mock catalog for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::injected_failure;
use crate::catalog::{
    CatalogError, CatalogStats, CategoryFilter, CategoryPage, FileVariant, NewTitle, TitleCatalog,
    TitleRecord,
};

/// Catalog wrapper that can fail mutations on demand.
///
/// Reads always go to the wrapped catalog. Calls to
/// `increment_download_count` are counted whether or not they fail.
pub struct MockCatalog {
    inner: Arc<dyn TitleCatalog>,
    fail_increments: AtomicBool,
    fail_adds: AtomicBool,
    increment_calls: AtomicUsize,
}

impl std::fmt::Debug for MockCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCatalog")
            .field("inner", &"<catalog>")
            .field("fail_increments", &self.fail_increments)
            .field("fail_adds", &self.fail_adds)
            .field("increment_calls", &self.increment_calls)
            .finish()
    }
}

impl MockCatalog {
    pub fn wrap(inner: Arc<dyn TitleCatalog>) -> Self {
        Self {
            inner,
            fail_increments: AtomicBool::new(false),
            fail_adds: AtomicBool::new(false),
            increment_calls: AtomicUsize::new(0),
        }
    }

    /// Make every `increment_download_count` fail until reset.
    pub fn fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }

    /// Make every `add_title` fail until reset.
    pub fn fail_adds(&self, fail: bool) {
        self.fail_adds.store(fail, Ordering::SeqCst);
    }

    pub fn increment_calls(&self) -> usize {
        self.increment_calls.load(Ordering::SeqCst)
    }
}

impl TitleCatalog for MockCatalog {
    fn add_title(&self, title: NewTitle) -> Result<u64, CatalogError> {
        if self.fail_adds.load(Ordering::SeqCst) {
            return Err(injected_failure("add_title").into());
        }
        self.inner.add_title(title)
    }

    fn get_title(&self, id: u64) -> Result<Option<TitleRecord>, CatalogError> {
        self.inner.get_title(id)
    }

    fn search_by_substring(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<TitleRecord>, CatalogError> {
        self.inner.search_by_substring(query, limit)
    }

    fn search_by_first_letter(
        &self,
        letter: char,
        limit: usize,
    ) -> Result<Vec<TitleRecord>, CatalogError> {
        self.inner.search_by_first_letter(letter, limit)
    }

    fn search_by_category(
        &self,
        filter: &CategoryFilter,
        limit: usize,
        offset: usize,
    ) -> Result<CategoryPage, CatalogError> {
        self.inner.search_by_category(filter, limit, offset)
    }

    fn delete_title(&self, id: u64) -> Result<bool, CatalogError> {
        self.inner.delete_title(id)
    }

    fn increment_download_count(&self, id: u64) -> Result<bool, CatalogError> {
        self.increment_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(injected_failure("increment_download_count").into());
        }
        self.inner.increment_download_count(id)
    }

    fn list_by_uploader(
        &self,
        uploader_id: i64,
        limit: usize,
    ) -> Result<Vec<TitleRecord>, CatalogError> {
        self.inner.list_by_uploader(uploader_id, limit)
    }

    fn update_file(
        &self,
        id: u64,
        quality: &str,
        variant: FileVariant,
    ) -> Result<bool, CatalogError> {
        self.inner.update_file(id, quality, variant)
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        self.inner.stats()
    }
}
