//! Persistence for the generation pipeline: profile reads, resume history, LLM request log.
//!
//! `ResumeStore` is the seam; `PgResumeStore` is the Postgres implementation.
//! Generated resumes are append-only: there is no update path.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::profile::{
    EducationRow, ExperienceRow, ProfileAggregate, ProfileRow, ProjectRow, SkillRow, UserRow,
};
use crate::models::resume::{GeneratedResumeRow, LlmRequestRecord, ResumeSummaryRow};

/// A resume ready to be stored. The store assigns `created_at`.
#[derive(Debug, Clone)]
pub struct NewResume {
    pub id: Uuid,
    pub user_id: Uuid,
    pub profile_id: Uuid,
    pub job_description: String,
    pub latex_content: String,
    pub pdf_file_path: Option<String>,
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// `Ok(None)` when the user or the profile does not exist (or the profile
    /// belongs to someone else). `Err` is reserved for transport failures.
    async fn load_profile_aggregate(
        &self,
        user_id: Uuid,
        profile_id: Uuid,
    ) -> Result<Option<ProfileAggregate>>;

    /// Inserts one resume atomically.
    async fn insert_resume(&self, resume: NewResume) -> Result<GeneratedResumeRow>;

    /// Newest first.
    async fn list_resumes(&self, user_id: Uuid) -> Result<Vec<ResumeSummaryRow>>;

    async fn get_resume(&self, user_id: Uuid, resume_id: Uuid)
        -> Result<Option<GeneratedResumeRow>>;

    /// Returns whether a row was deleted.
    async fn delete_resume(&self, user_id: Uuid, resume_id: Uuid) -> Result<bool>;

    async fn log_llm_request(&self, record: &LlmRequestRecord) -> Result<()>;
}

#[derive(Clone)]
pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn load_profile_aggregate(
        &self,
        user_id: Uuid,
        profile_id: Uuid,
    ) -> Result<Option<ProfileAggregate>> {
        let Some(user) = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let Some(profile) = sqlx::query_as::<_, ProfileRow>(
            "SELECT * FROM profiles WHERE id = $1 AND user_id = $2",
        )
        .bind(profile_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        // sort_order is the order the user arranged entries in.
        let education = sqlx::query_as::<_, EducationRow>(
            "SELECT * FROM education WHERE profile_id = $1 ORDER BY sort_order, created_at",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        let experience = sqlx::query_as::<_, ExperienceRow>(
            "SELECT * FROM experience WHERE profile_id = $1 ORDER BY sort_order, created_at",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        let projects = sqlx::query_as::<_, ProjectRow>(
            "SELECT * FROM projects WHERE profile_id = $1 ORDER BY sort_order, created_at",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        let skills = sqlx::query_as::<_, SkillRow>(
            "SELECT * FROM skills WHERE profile_id = $1 ORDER BY sort_order, created_at",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ProfileAggregate {
            user,
            profile,
            education,
            experience,
            projects,
            skills,
        }))
    }

    async fn insert_resume(&self, resume: NewResume) -> Result<GeneratedResumeRow> {
        let row = sqlx::query_as::<_, GeneratedResumeRow>(
            r#"
            INSERT INTO generated_resumes
                (id, user_id, profile_id, job_description, latex_content, pdf_file_path)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(resume.id)
        .bind(resume.user_id)
        .bind(resume.profile_id)
        .bind(&resume.job_description)
        .bind(&resume.latex_content)
        .bind(&resume.pdf_file_path)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "Inserted generated resume {} for user {}, profile {}",
            row.id, row.user_id, row.profile_id
        );
        Ok(row)
    }

    async fn list_resumes(&self, user_id: Uuid) -> Result<Vec<ResumeSummaryRow>> {
        Ok(sqlx::query_as::<_, ResumeSummaryRow>(
            r#"
            SELECT id, profile_id, job_description, created_at
            FROM generated_resumes
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_resume(
        &self,
        user_id: Uuid,
        resume_id: Uuid,
    ) -> Result<Option<GeneratedResumeRow>> {
        Ok(sqlx::query_as::<_, GeneratedResumeRow>(
            "SELECT * FROM generated_resumes WHERE id = $1 AND user_id = $2",
        )
        .bind(resume_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_resume(&self, user_id: Uuid, resume_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM generated_resumes WHERE id = $1 AND user_id = $2")
            .bind(resume_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn log_llm_request(&self, record: &LlmRequestRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO llm_requests
                (user_id, prompt_tokens, completion_tokens, total_tokens,
                 model_used, response_time_ms, status, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.user_id)
        .bind(record.prompt_tokens.map(|t| t as i32))
        .bind(record.completion_tokens.map(|t| t as i32))
        .bind(record.total_tokens.map(|t| t as i32))
        .bind(&record.model_used)
        .bind(record.response_time_ms as i64)
        .bind(record.status.as_str())
        .bind(&record.error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory `ResumeStore` for pipeline and handler tests.

    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    pub struct MemoryStore {
        pub aggregates: Vec<ProfileAggregate>,
        pub resumes: Mutex<Vec<GeneratedResumeRow>>,
        pub llm_requests: Mutex<Vec<LlmRequestRecord>>,
        pub fail_inserts: bool,
    }

    impl MemoryStore {
        pub fn with_aggregate(aggregate: ProfileAggregate) -> Self {
            Self {
                aggregates: vec![aggregate],
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ResumeStore for MemoryStore {
        async fn load_profile_aggregate(
            &self,
            user_id: Uuid,
            profile_id: Uuid,
        ) -> Result<Option<ProfileAggregate>> {
            Ok(self
                .aggregates
                .iter()
                .find(|a| a.user.id == user_id && a.profile.id == profile_id)
                .cloned())
        }

        async fn insert_resume(&self, resume: NewResume) -> Result<GeneratedResumeRow> {
            if self.fail_inserts {
                anyhow::bail!("connection reset by peer");
            }
            let row = GeneratedResumeRow {
                id: resume.id,
                user_id: resume.user_id,
                profile_id: resume.profile_id,
                job_description: resume.job_description,
                latex_content: resume.latex_content,
                pdf_file_path: resume.pdf_file_path,
                created_at: Utc::now(),
            };
            self.resumes.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn list_resumes(&self, user_id: Uuid) -> Result<Vec<ResumeSummaryRow>> {
            let resumes = self.resumes.lock().unwrap();
            let mut rows: Vec<ResumeSummaryRow> = resumes
                .iter()
                .filter(|r| r.user_id == user_id)
                .map(ResumeSummaryRow::from)
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        async fn get_resume(
            &self,
            user_id: Uuid,
            resume_id: Uuid,
        ) -> Result<Option<GeneratedResumeRow>> {
            Ok(self
                .resumes
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == resume_id && r.user_id == user_id)
                .cloned())
        }

        async fn delete_resume(&self, user_id: Uuid, resume_id: Uuid) -> Result<bool> {
            let mut resumes = self.resumes.lock().unwrap();
            let before = resumes.len();
            resumes.retain(|r| !(r.id == resume_id && r.user_id == user_id));
            Ok(resumes.len() < before)
        }

        async fn log_llm_request(&self, record: &LlmRequestRecord) -> Result<()> {
            self.llm_requests.lock().unwrap().push(record.clone());
            Ok(())
        }
    }
}
