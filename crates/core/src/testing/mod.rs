//! Testing utilities: sample titles and fault-injecting store wrappers.
//!
//! The wrappers delegate to a real store and fail selected operations on
//! demand, so persistence-failure paths can be exercised without a broken
//! disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use moviezone_core::testing::{fixtures, MockCatalog};
//!
//! let catalog = Arc::new(MockCatalog::wrap(Arc::new(JsonCatalog::open(&path)?)));
//! let id = catalog.add_title(fixtures::movie("Jawan", 1))?;
//!
//! catalog.fail_increments(true);
//! // redeem still delivers the file, the counter just does not move
//! ```

mod mock_catalog;
mod mock_token_store;

pub use mock_catalog::MockCatalog;
pub use mock_token_store::MockTokenStore;

use crate::storage::StorageError;

fn injected_failure(operation: &str) -> StorageError {
    StorageError::Io {
        path: "<mock>".to_string(),
        message: format!("injected failure in {}", operation),
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::BTreeMap;

    use crate::catalog::{FileVariant, NewTitle};

    /// A movie with "480p" and "720p" files and no categories or languages.
    ///
    /// File handles are derived from the name: `"<name>-480p"`.
    pub fn movie(title: &str, uploader_id: i64) -> NewTitle {
        let files: BTreeMap<String, FileVariant> = ["480p", "720p"]
            .into_iter()
            .map(|q| {
                (
                    q.to_string(),
                    FileVariant::new(format!("{}-{}", title, q))
                        .with_unique_id(format!("uniq-{}-{}", title, q)),
                )
            })
            .collect();

        NewTitle {
            title: title.to_string(),
            release_year: "2023".to_string(),
            runtime: "2h 30m".to_string(),
            rating: "7.5".to_string(),
            files,
            uploader_id,
            ..Default::default()
        }
    }

    /// A series with one file per episode, labelled "E01", "E02", ...
    pub fn series(title: &str, uploader_id: i64, episodes: u32) -> NewTitle {
        let files = (1..=episodes)
            .map(|e| {
                let label = format!("E{:02}", e);
                let variant = FileVariant::new(format!("{}-{}", title, label));
                (label, variant)
            })
            .collect();

        NewTitle {
            title: title.to_string(),
            release_year: "2020".to_string(),
            categories: vec!["📺 Web Series".to_string()],
            files,
            is_series: true,
            uploader_id,
            ..Default::default()
        }
    }

    /// A movie tagged with the given categories.
    pub fn movie_in(title: &str, uploader_id: i64, categories: &[&str]) -> NewTitle {
        NewTitle {
            categories: categories.iter().map(|c| c.to_string()).collect(),
            ..movie(title, uploader_id)
        }
    }
}
