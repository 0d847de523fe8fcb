//! Structured-store access + shared HTTP client construction for jobtrack.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use jobtrack_core::{DateRange, JobRecord, JobStatus, StoredJob};
use thiserror::Error;

pub mod notion;

pub use notion::{NotionConfig, NotionStore};

pub const CRATE_NAME: &str = "jobtrack-storage";

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: Some(concat!("jobtrack/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

impl HttpClientConfig {
    /// One client per process; both outbound APIs share its connection pool.
    pub fn build_client(&self) -> anyhow::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(self.timeout);

        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        builder.build().context("building reqwest client")
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("store returned http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("store object not found: {0}")]
    NotFound(String),
    #[error("decoding store response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Record filters the core relies on. Each maps onto one store-side property filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFilter {
    UrlEquals(String),
    StatusEquals(JobStatus),
    /// Records created within the selected range, as the store interprets it.
    CreatedWithin(DateRange),
    AppliedDatePresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSort {
    AppliedDateDescending,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreQuery {
    pub filter: Option<StoreFilter>,
    pub sort: Option<StoreSort>,
}

impl StoreQuery {
    pub fn filtered(filter: StoreFilter) -> Self {
        Self {
            filter: Some(filter),
            sort: None,
        }
    }

    pub fn sorted(mut self, sort: StoreSort) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Capability the service needs from the hosted page database.
///
/// `query_records` returns the complete result set for the filter; page
/// traversal is the implementation's job.
#[async_trait]
pub trait StructuredStoreClient: Send + Sync {
    async fn query_records(&self, query: &StoreQuery) -> Result<Vec<StoredJob>, StoreError>;

    /// Persist a new record with status `Not Applied` and return the store's view of it.
    async fn create_record(&self, job: &JobRecord) -> Result<JobRecord, StoreError>;

    async fn fetch_record(&self, id: &str) -> Result<StoredJob, StoreError>;

    async fn update_status_to_applied(
        &self,
        id: &str,
        applied_at: DateTime<FixedOffset>,
    ) -> Result<(), StoreError>;
}
