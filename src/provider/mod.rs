pub mod glesys;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One DNS record as the provider knows it.
///
/// Only `data` is ever changed locally; the whole record is sent back on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "recordid")]
    pub record_id: u64,
    pub host: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub data: String,
    pub ttl: u32,
}

/// Remote record store, listed per domain and updated one record at a time.
#[async_trait]
pub trait DnsDirectory: Send + Sync {
    async fn list_records(&self, domain: &str) -> Result<Vec<Record>>;

    async fn update_record(&self, record: &Record) -> Result<()>;
}
