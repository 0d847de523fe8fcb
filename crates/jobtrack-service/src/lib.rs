//! Job orchestration: normalization, duplicate checks, lifecycle updates and
//! the stats/streak reads, wired against the store and completion capabilities.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, Local};
use jobtrack_completion::prompts::{comparison_request, extraction_request};
use jobtrack_completion::{parse_json_payload, CompletionClient, GroqClient};
use jobtrack_core::{
    stats, streak, DateRange, ExtractedJob, JobComparison, JobRecord, JobStatus, StatsResult,
    StreakStats,
};
use jobtrack_storage::{
    NotionStore, StoreError, StoreFilter, StoreQuery, StoreSort, StructuredStoreClient,
};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

pub mod config;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{ConfigError, RelayConfig, RunMode};
pub use error::{JobServiceError, UpstreamError};

pub const CRATE_NAME: &str = "jobtrack-service";

pub type ServiceResult<T> = Result<T, JobServiceError>;

#[derive(Debug, Clone, Deserialize)]
pub struct SaveJobRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckJobRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareJobRequest {
    #[serde(default)]
    pub resume: serde_json::Value,
    #[serde(default)]
    pub job_posting: String,
}

pub struct JobService {
    store: Arc<dyn StructuredStoreClient>,
    completion: Arc<dyn CompletionClient>,
    extraction_model: String,
    comparison_model: String,
}

impl JobService {
    pub fn new(
        store: Arc<dyn StructuredStoreClient>,
        completion: Arc<dyn CompletionClient>,
        extraction_model: impl Into<String>,
        comparison_model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            completion,
            extraction_model: extraction_model.into(),
            comparison_model: comparison_model.into(),
        }
    }

    /// Hosted clients sharing one HTTP connection pool.
    pub fn from_config(config: &RelayConfig) -> anyhow::Result<Self> {
        let client = config
            .http_client_config()
            .build_client()
            .context("building outbound http client")?;
        let store = NotionStore::new(client.clone(), config.notion_config());
        let completion = GroqClient::new(client, config.groq_config());
        Ok(Self::new(
            Arc::new(store),
            Arc::new(completion),
            config.extraction_model.clone(),
            config.comparison_model.clone(),
        ))
    }

    /// Fails with `Conflict` when any stored record already carries `url`.
    pub async fn check_exists(&self, url: &str) -> ServiceResult<()> {
        let url = url.trim();
        if url.is_empty() {
            return Err(JobServiceError::validation("url is required"));
        }
        let matches = self
            .store
            .query_records(&StoreQuery::filtered(StoreFilter::UrlEquals(url.to_string())))
            .await?;
        if matches.is_empty() {
            Ok(())
        } else {
            debug!(url, matches = matches.len(), "duplicate url");
            Err(JobServiceError::Conflict {
                url: url.to_string(),
            })
        }
    }

    /// Extract structured fields from a raw posting and persist them.
    ///
    /// The duplicate check and the write are not atomic; two concurrent
    /// saves of the same url can both succeed.
    pub async fn save_job(&self, request: SaveJobRequest) -> ServiceResult<JobRecord> {
        let url = request.url.trim().to_string();
        if url.is_empty() {
            return Err(JobServiceError::validation("url is required"));
        }
        if request.description.trim().is_empty() {
            return Err(JobServiceError::validation("description is required"));
        }

        self.check_exists(&url).await?;

        let content = self
            .completion
            .complete(&extraction_request(&self.extraction_model, &request.description))
            .await?;
        let extracted: ExtractedJob = parse_json_payload(&content)?;

        let saved = self.store.create_record(&extracted.into_record(url)).await?;
        info!(id = ?saved.id, url = %saved.url, "job saved");
        Ok(saved)
    }

    pub async fn compare_job_posting(&self, request: CompareJobRequest) -> ServiceResult<JobComparison> {
        if request.job_posting.trim().is_empty() {
            return Err(JobServiceError::validation("jobPosting is required"));
        }
        let content = self
            .completion
            .complete(&comparison_request(
                &self.comparison_model,
                &request.resume,
                &request.job_posting,
            ))
            .await?;
        Ok(parse_json_payload(&content)?)
    }

    /// Saved postings not yet applied to.
    pub async fn recent_jobs(&self) -> ServiceResult<Vec<JobRecord>> {
        let jobs = self
            .store
            .query_records(&StoreQuery::filtered(StoreFilter::StatusEquals(
                JobStatus::NotApplied,
            )))
            .await?;
        Ok(jobs.into_iter().map(|job| job.record).collect())
    }

    pub async fn mark_applied(&self, id: &str) -> ServiceResult<()> {
        self.mark_applied_at(id, Local::now().fixed_offset()).await
    }

    /// Move a record to `Applied`, stamping `now`. Already-applied records
    /// are left as they are.
    pub async fn mark_applied_at(&self, id: &str, now: DateTime<FixedOffset>) -> ServiceResult<()> {
        let id = id.trim();
        if Uuid::parse_str(id).is_err() {
            return Err(JobServiceError::validation(format!("{id:?} is not a page id")));
        }

        let current = match self.store.fetch_record(id).await {
            Ok(job) => job,
            Err(StoreError::NotFound(_)) => {
                return Err(JobServiceError::NotFound { id: id.to_string() })
            }
            Err(err) => return Err(err.into()),
        };
        if current.status() == Some(JobStatus::Applied) {
            info!(id, applied_date = ?current.applied_date, "job already applied");
            return Ok(());
        }

        self.store.update_status_to_applied(id, now).await?;
        info!(id, "job marked applied");
        Ok(())
    }

    pub async fn stats(&self, range: DateRange) -> ServiceResult<StatsResult> {
        self.stats_at(range, Local::now().fixed_offset()).await
    }

    pub async fn stats_at(&self, range: DateRange, now: DateTime<FixedOffset>) -> ServiceResult<StatsResult> {
        let jobs = self
            .store
            .query_records(&StoreQuery::filtered(StoreFilter::CreatedWithin(range)))
            .await?;
        debug!(range = range.as_str(), records = jobs.len(), "aggregating stats");
        Ok(stats::aggregate(&jobs, range, now))
    }

    pub async fn streak(&self) -> ServiceResult<StreakStats> {
        self.streak_at(Local::now().fixed_offset()).await
    }

    pub async fn streak_at(&self, now: DateTime<FixedOffset>) -> ServiceResult<StreakStats> {
        let jobs = self
            .store
            .query_records(
                &StoreQuery::filtered(StoreFilter::AppliedDatePresent)
                    .sorted(StoreSort::AppliedDateDescending),
            )
            .await?;
        Ok(streak::compute_streak(&jobs, now))
    }
}
