//! Optional PDF compilation of a finished resume.
//!
//! `PdfLatexCompiler` runs `pdflatex` in a scratch directory and uploads the PDF
//! to S3 / MinIO. Callers treat every `CompileError` as non-fatal: the LaTeX is
//! stored either way.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::StorageConfig;

const PDFLATEX_TIMEOUT: Duration = Duration::from_secs(30);

/// How much of the pdflatex log to keep in an error.
const LOG_TAIL_LINES: usize = 15;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdflatex timed out after {0:?}")]
    Timeout(Duration),

    #[error("pdflatex failed ({status}): {log_tail}")]
    Failed { status: String, log_tail: String },

    #[error("S3 upload failed: {0}")]
    Upload(String),

    #[error("S3 delete failed: {0}")]
    Delete(String),
}

#[async_trait]
pub trait DocumentCompiler: Send + Sync {
    /// Compiles `latex` and returns where the artifact was stored.
    async fn compile(&self, resume_key: &str, latex: &str) -> Result<String, CompileError>;

    /// Removes an artifact returned by `compile` whose resume was never stored.
    async fn discard(&self, artifact: &str) -> Result<(), CompileError>;
}

pub struct PdfLatexCompiler {
    s3: S3Client,
    bucket: String,
    timeout: Duration,
}

impl PdfLatexCompiler {
    pub fn new(s3: S3Client, bucket: String) -> Self {
        Self {
            s3,
            bucket,
            timeout: PDFLATEX_TIMEOUT,
        }
    }

    pub async fn from_config(storage: &StorageConfig) -> Self {
        Self::new(build_s3_client(storage).await, storage.s3_bucket.clone())
    }

    async fn run_pdflatex(&self, dir: &Path, latex: &str) -> Result<Vec<u8>, CompileError> {
        tokio::fs::write(dir.join("resume.tex"), latex).await?;

        let mut command = Command::new("pdflatex");
        command
            .args(["-interaction=nonstopmode", "-halt-on-error", "resume.tex"])
            .current_dir(dir)
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| CompileError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(CompileError::Failed {
                status: output.status.to_string(),
                log_tail: log_tail(&String::from_utf8_lossy(&output.stdout)),
            });
        }

        Ok(tokio::fs::read(dir.join("resume.pdf")).await?)
    }
}

#[async_trait]
impl DocumentCompiler for PdfLatexCompiler {
    async fn compile(&self, resume_key: &str, latex: &str) -> Result<String, CompileError> {
        // Removed when dropped, on every exit path.
        let scratch = tempfile::tempdir()?;
        let pdf = self.run_pdflatex(scratch.path(), latex).await?;
        debug!("pdflatex produced {} bytes for {resume_key}", pdf.len());

        let key = artifact_key(resume_key);
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/pdf")
            .body(ByteStream::from(pdf))
            .send()
            .await
            .map_err(|e| CompileError::Upload(e.to_string()))?;

        info!("Uploaded compiled resume to s3://{}/{key}", self.bucket);
        Ok(key)
    }

    async fn discard(&self, artifact: &str) -> Result<(), CompileError> {
        self.s3
            .delete_object()
            .bucket(&self.bucket)
            .key(artifact)
            .send()
            .await
            .map_err(|e| CompileError::Delete(e.to_string()))?;

        info!("Discarded orphaned artifact s3://{}/{artifact}", self.bucket);
        Ok(())
    }
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
pub async fn build_s3_client(storage: &StorageConfig) -> S3Client {
    let credentials = Credentials::new(
        &storage.aws_access_key_id,
        &storage.aws_secret_access_key,
        None,
        None,
        "texume-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&storage.s3_endpoint)
        .load()
        .await;

    let config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    S3Client::from_conf(config)
}

pub fn artifact_key(resume_key: &str) -> String {
    format!("resumes/{resume_key}.pdf")
}

/// Last lines of the pdflatex log; the first error is usually near the end.
fn log_tail(log: &str) -> String {
    let lines: Vec<&str> = log.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    lines[start..].join("\n")
}
