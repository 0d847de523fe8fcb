use jobtrack_completion::CompletionError;
use jobtrack_storage::StoreError;
use thiserror::Error;

/// A failed call to one of the two hosted APIs.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

#[derive(Debug, Error)]
pub enum JobServiceError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("a job with url {url} is already saved")]
    Conflict { url: String },
    #[error("job {id} not found")]
    NotFound { id: String },
    #[error("upstream call failed: {0}")]
    Upstream(#[source] UpstreamError),
    #[error("completion reply could not be parsed: {0}")]
    MalformedUpstreamResponse(#[source] CompletionError),
}

impl JobServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<StoreError> for JobServiceError {
    fn from(err: StoreError) -> Self {
        Self::Upstream(UpstreamError::Store(err))
    }
}

impl From<CompletionError> for JobServiceError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::MalformedPayload(_) | CompletionError::EmptyResponse => {
                Self::MalformedUpstreamResponse(err)
            }
            other => Self::Upstream(UpstreamError::Completion(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_errors_split_by_kind() {
        let malformed = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        assert!(matches!(
            JobServiceError::from(CompletionError::MalformedPayload(malformed)),
            JobServiceError::MalformedUpstreamResponse(_)
        ));
        assert!(matches!(
            JobServiceError::from(CompletionError::EmptyResponse),
            JobServiceError::MalformedUpstreamResponse(_)
        ));
        assert!(matches!(
            JobServiceError::from(CompletionError::HttpStatus {
                status: 500,
                body: String::new()
            }),
            JobServiceError::Upstream(UpstreamError::Completion(_))
        ));
    }

    #[test]
    fn store_errors_are_upstream() {
        let err = JobServiceError::from(StoreError::NotFound("pages/x".into()));
        assert!(matches!(err, JobServiceError::Upstream(UpstreamError::Store(_))));
        assert!(err.to_string().contains("pages/x"));
    }
}
