use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use super::{RequestCollection, RequestError, RequestRecord, RequestStatus, RequestStore};
use crate::metrics;
use crate::storage::{Change, JsonCollection};

/// Request store persisted in `requests.json`.
pub struct JsonRequestStore {
    collection: JsonCollection<RequestCollection>,
}

impl JsonRequestStore {
    pub fn open(path: &Path) -> Result<Self, RequestError> {
        Ok(Self {
            collection: JsonCollection::open(path)?,
        })
    }
}

impl RequestStore for JsonRequestStore {
    fn submit(&self, user_id: i64, title: &str) -> Result<RequestRecord, RequestError> {
        let record = self.collection.write(|data| {
            let record = RequestRecord {
                id: data.next_id,
                user_id,
                title: title.trim().to_string(),
                status: RequestStatus::Pending,
                created_at: Utc::now(),
                updated_at: None,
            };
            data.requests.insert(record.id, record.clone());
            data.next_id += 1;
            Change::Persist(record)
        })?;

        metrics::TITLE_REQUESTS
            .with_label_values(&[RequestStatus::Pending.as_str()])
            .inc();
        info!(
            "Added new title request: {} - {} by user {}",
            record.id, record.title, user_id
        );
        Ok(record)
    }

    fn get(&self, id: u64) -> Result<Option<RequestRecord>, RequestError> {
        Ok(self.collection.read(|data| data.requests.get(&id).cloned())?)
    }

    fn pending(&self, limit: usize) -> Result<Vec<RequestRecord>, RequestError> {
        Ok(self.collection.read(|data| {
            data.requests
                .values()
                .filter(|r| r.status == RequestStatus::Pending)
                .take(limit)
                .cloned()
                .collect()
        })?)
    }

    fn set_status(&self, id: u64, status: RequestStatus) -> Result<RequestRecord, RequestError> {
        let result = self.collection.write(|data| {
            let Some(record) = data.requests.get_mut(&id) else {
                return Change::Discard(Err(RequestError::NotFound(id)));
            };
            if record.status.is_terminal() || !status.is_terminal() {
                return Change::Discard(Err(RequestError::InvalidState {
                    current: record.status,
                    requested: status,
                }));
            }
            record.status = status;
            record.updated_at = Some(Utc::now());
            Change::Persist(Ok(record.clone()))
        })?;

        match &result {
            Ok(record) => {
                metrics::TITLE_REQUESTS
                    .with_label_values(&[status.as_str()])
                    .inc();
                info!("Updated request {} status to {}", id, record.status);
            }
            Err(e) => warn!("Cannot update request {}: {}", id, e),
        }
        result
    }
}
