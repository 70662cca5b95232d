use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A stored resume. Rows are append-only: regenerating inserts a new row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GeneratedResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub profile_id: Uuid,
    pub job_description: String,
    pub latex_content: String,
    pub pdf_file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Listing view; omits the LaTeX body.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeSummaryRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub job_description: String,
    pub created_at: DateTime<Utc>,
}

impl From<&GeneratedResumeRow> for ResumeSummaryRow {
    fn from(row: &GeneratedResumeRow) -> Self {
        Self {
            id: row.id,
            profile_id: row.profile_id,
            job_description: row.job_description.clone(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmRequestStatus {
    Success,
    Failed,
}

impl LlmRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmRequestStatus::Success => "success",
            LlmRequestStatus::Failed => "failed",
        }
    }
}

/// One LLM call, logged for billing and monitoring.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequestRecord {
    pub user_id: Uuid,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
    pub model_used: String,
    pub response_time_ms: u64,
    pub status: LlmRequestStatus,
    pub error_message: Option<String>,
}
