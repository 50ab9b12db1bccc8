//! Title requests submitted by users and triaged by admins.

mod json;
mod types;

pub use json::JsonRequestStore;
pub use types::*;

/// Trait for request storage.
pub trait RequestStore: Send + Sync {
    /// Record a new pending request and return it.
    fn submit(&self, user_id: i64, title: &str) -> Result<RequestRecord, RequestError>;

    fn get(&self, id: u64) -> Result<Option<RequestRecord>, RequestError>;

    /// First `limit` pending requests in submission order.
    fn pending(&self, limit: usize) -> Result<Vec<RequestRecord>, RequestError>;

    /// Move a pending request to `Accepted` or `Deleted`.
    ///
    /// Settled requests are kept and cannot change again.
    fn set_status(&self, id: u64, status: RequestStatus) -> Result<RequestRecord, RequestError>;
}
