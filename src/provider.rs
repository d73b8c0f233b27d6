use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PennyError, Result};

/// One record from the external financial-data provider. `amount` keeps the
/// provider's sign convention: negative = inflow, positive = outflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddedTransaction {
    pub external_id: String,
    pub account_id: String,
    pub amount: f64,
    /// ISO date, e.g. "2025-02-15".
    pub date: String,
    pub name: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub pending: bool,
}

/// One page of newly added records plus the cursor to resume from.
#[derive(Debug, Clone)]
pub struct SyncPage {
    pub added: Vec<AddedTransaction>,
    pub next_cursor: String,
    pub has_more: bool,
}

/// The paginated sync contract the ingestion engine consumes. A retried
/// fetch for the same cursor must return the same records.
pub trait TransactionSource {
    fn fetch_new(&self, access_token: &str, cursor: Option<&str>, count: usize) -> Result<SyncPage>;
}

/// Feed-file source: the access token is a path to a JSON array of
/// `AddedTransaction`, and the cursor is a decimal offset into that array.
/// Stands in for the hosted provider the same way bank-export files do in
/// other bookkeeping tools.
pub struct FeedSource;

impl TransactionSource for FeedSource {
    fn fetch_new(&self, access_token: &str, cursor: Option<&str>, count: usize) -> Result<SyncPage> {
        let path = Path::new(access_token);
        let content = std::fs::read_to_string(path)
            .map_err(|e| PennyError::Upstream(format!("cannot read feed {access_token}: {e}")))?;
        let all: Vec<AddedTransaction> = serde_json::from_str(&content)
            .map_err(|e| PennyError::Upstream(format!("malformed feed {access_token}: {e}")))?;

        let start: usize = match cursor {
            Some(c) => c
                .parse()
                .map_err(|_| PennyError::Upstream(format!("bad cursor '{c}'")))?,
            None => 0,
        };
        let start = start.min(all.len());
        let end = (start + count).min(all.len());

        Ok(SyncPage {
            added: all[start..end].to_vec(),
            next_cursor: end.to_string(),
            has_more: end < all.len(),
        })
    }
}
