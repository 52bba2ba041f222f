//! Collaborator contracts for the REST side of the sidebar.
//!
//! Implementations create the request future eagerly and hand it back; callers decide whether
//! to await it or fire and forget.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

use sidekick_live::SubjectId;

/// Read-only snapshot of one AI thread as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: SubjectId,
    pub message: String,
    pub channel_id: String,
    pub title: String,
    pub reply_count: u64,
    pub update_at: i64,
}

/// "Read as of" intent for one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadMark {
    pub user_id: String,
    pub team_id: String,
    pub subject_id: SubjectId,
    pub read_at_ms: i64,
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApiError {
    #[snafu(display("request failed on `{stage}`: {message}"))]
    Request {
        stage: &'static str,
        message: String,
    },
    #[snafu(display("server returned status {status} on `{stage}`: {body}"))]
    Status {
        stage: &'static str,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to decode response on `{stage}`: {source}"))]
    Decode {
        stage: &'static str,
        source: serde_json::Error,
    },
}

pub trait ThreadsApi: Send + Sync {
    fn get_threads(&self) -> BoxFuture<'static, ApiResult<Vec<ThreadSummary>>>;
}

/// Duplicate marks for the same thread must be tolerated by implementations.
pub trait ReadApi: Send + Sync {
    fn update_read(&self, mark: ReadMark) -> BoxFuture<'static, ApiResult<()>>;
}
