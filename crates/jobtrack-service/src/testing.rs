//! In-memory stand-ins for the hosted store and completion APIs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use jobtrack_completion::{CompletionClient, CompletionError, CompletionRequest};
use jobtrack_core::{JobRecord, JobStatus, StoredJob};
use jobtrack_storage::{StoreError, StoreFilter, StoreQuery, StoreSort, StructuredStoreClient};
use tokio::sync::{Barrier, Mutex};
use uuid::Uuid;

/// Store backed by a vector. `CreatedWithin` matches every record since no
/// creation time is tracked.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<StoredJob>>,
    unavailable: bool,
    queries: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl InMemoryStore {
    pub fn with_records(records: Vec<StoredJob>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Every call fails with HTTP 503.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub async fn records(&self) -> Vec<StoredJob> {
        self.records.lock().await.clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::HttpStatus {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn matches(filter: &StoreFilter, job: &StoredJob) -> bool {
    match filter {
        StoreFilter::UrlEquals(url) => job.record.url == *url,
        StoreFilter::StatusEquals(status) => job.status == status.label(),
        StoreFilter::CreatedWithin(_) => true,
        StoreFilter::AppliedDatePresent => job.applied_date.as_deref().is_some_and(|d| !d.is_empty()),
    }
}

#[async_trait]
impl StructuredStoreClient for InMemoryStore {
    async fn query_records(&self, query: &StoreQuery) -> Result<Vec<StoredJob>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut found = self
            .records
            .lock()
            .await
            .iter()
            .filter(|job| query.filter.as_ref().map_or(true, |f| matches(f, job)))
            .cloned()
            .collect::<Vec<_>>();
        if let Some(StoreSort::AppliedDateDescending) = query.sort {
            found.sort_by(|a, b| b.applied_date.cmp(&a.applied_date));
        }
        Ok(found)
    }

    async fn create_record(&self, job: &JobRecord) -> Result<JobRecord, StoreError> {
        self.check_available()?;
        let record = JobRecord {
            id: Some(Uuid::new_v4().to_string()),
            ..job.clone()
        };
        self.records.lock().await.push(StoredJob {
            record: record.clone(),
            status: JobStatus::NotApplied.label().to_string(),
            applied_date: None,
        });
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn fetch_record(&self, id: &str) -> Result<StoredJob, StoreError> {
        self.check_available()?;
        self.records
            .lock()
            .await
            .iter()
            .find(|job| job.record.id.as_deref() == Some(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("pages/{id}")))
    }

    async fn update_status_to_applied(
        &self,
        id: &str,
        applied_at: DateTime<FixedOffset>,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut records = self.records.lock().await;
        let job = records
            .iter_mut()
            .find(|job| job.record.id.as_deref() == Some(id))
            .ok_or_else(|| StoreError::NotFound(format!("pages/{id}")))?;
        job.status = JobStatus::Applied.label().to_string();
        job.applied_date = Some(applied_at.to_rfc3339_opts(SecondsFormat::Secs, false));
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Content(String),
    Status(u16),
}

/// Completion client that answers every request with the same scripted reply.
#[derive(Debug)]
pub struct ScriptedCompletion {
    reply: Reply,
    barrier: Option<Arc<Barrier>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn replying(content: impl Into<String>) -> Self {
        Self::new(Reply::Content(content.into()))
    }

    pub fn failing_with_status(status: u16) -> Self {
        Self::new(Reply::Status(status))
    }

    fn new(reply: Reply) -> Self {
        Self {
            reply,
            barrier: None,
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Hold each call at `barrier` before replying, so concurrent callers
    /// are all inside the completion step at once.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        match &self.reply {
            Reply::Content(content) => Ok(content.clone()),
            Reply::Status(status) => Err(CompletionError::HttpStatus {
                status: *status,
                body: "scripted failure".to_string(),
            }),
        }
    }
}
