//! Administrative endpoints for correlation-store diagnostics.

use std::sync::Arc;

use rocket::get;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};

use crate::store::CorrelationStore;

/// Aggregate view of the correlation store.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreStatusResponse {
    /// Number of recorded correlations.
    #[serde(rename = "totalCorrelations")]
    pub total_correlations: usize,
    /// On-disk snapshot location.
    #[serde(rename = "storePath")]
    pub store_path: String,
}

/// One recorded correlation.
#[derive(Debug, Serialize, Deserialize)]
pub struct CorrelationEntry {
    /// Outbound message identifier.
    #[serde(rename = "messageId")]
    pub message_id: String,
    /// Issue the email thread belongs to.
    #[serde(rename = "issueNumber")]
    pub issue_number: i64,
}

/// Return the correlation store's entry count and snapshot path.
#[get("/admin/store/status")]
pub fn store_status(store: &State<Arc<CorrelationStore>>) -> Json<StoreStatusResponse> {
    Json(StoreStatusResponse {
        total_correlations: store.len(),
        store_path: store.path().display().to_string(),
    })
}

/// List every recorded correlation, sorted by message id.
///
/// Diagnostics only; the listing walks the whole store and is not meant
/// for the webhook hot path.
#[get("/admin/store/correlations")]
pub fn list_correlations(store: &State<Arc<CorrelationStore>>) -> Json<Vec<CorrelationEntry>> {
    let entries = store
        .list_all()
        .into_iter()
        .map(|(message_id, issue_number)| CorrelationEntry {
            message_id,
            issue_number,
        })
        .collect();
    Json(entries)
}
