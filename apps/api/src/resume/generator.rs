//! Resume generation: orchestrates one request end to end.
//!
//! Flow: load profile → build prompt → LLM completion → split sections →
//!       format entries → populate template → validate → (compile) → persist.
//!
//! Everything after the completion is deterministic and cannot fail: with a usable
//! completion the result is always a fully populated document. Validator findings
//! and compile failures are logged, never returned.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::GenerationConfig;
use crate::llm_client::prompts::RESUME_WRITER_SYSTEM;
use crate::llm_client::{Completion, CompletionProvider, CompletionRequest, LlmError};
use crate::models::profile::ProfileAggregate;
use crate::models::resume::{GeneratedResumeRow, LlmRequestRecord, LlmRequestStatus};
use crate::resume::compiler::DocumentCompiler;
use crate::resume::entries::{format_skills, EntryFormatter};
use crate::resume::escape::escape_latex;
use crate::resume::prompts::build_prompt;
use crate::resume::sections::{parse_sections, Section};
use crate::resume::store::{NewResume, ResumeStore};
use crate::resume::template::{self, ResumeTemplate, TemplateValues};
use crate::resume::validator::validate;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Where a generation request is. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    BuildingPrompt,
    AwaitingCompletion,
    ParsingSections,
    FormattingEntries,
    PopulatingTemplate,
    Validating,
    Compiling,
    Persisted,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationStage::BuildingPrompt => "building_prompt",
            GenerationStage::AwaitingCompletion => "awaiting_completion",
            GenerationStage::ParsingSections => "parsing_sections",
            GenerationStage::FormattingEntries => "formatting_entries",
            GenerationStage::PopulatingTemplate => "populating_template",
            GenerationStage::Validating => "validating",
            GenerationStage::Compiling => "compiling",
            GenerationStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("user {user_id} or profile {profile_id} not found")]
    MissingAggregateData { user_id: Uuid, profile_id: Uuid },

    #[error("completion failed: {0}")]
    CompletionFailed(#[from] LlmError),

    #[error("persistence failed: {0}")]
    Persistence(#[from] anyhow::Error),
}

/// Request body for resume generation.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub user_id: Uuid,
    pub profile_id: Uuid,
    pub job_description: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Generation pipeline
// ────────────────────────────────────────────────────────────────────────────

pub struct ResumeGenerator {
    llm: Arc<dyn CompletionProvider>,
    store: Arc<dyn ResumeStore>,
    compiler: Option<Arc<dyn DocumentCompiler>>,
    template: ResumeTemplate,
    config: GenerationConfig,
}

impl ResumeGenerator {
    pub fn new(
        llm: Arc<dyn CompletionProvider>,
        store: Arc<dyn ResumeStore>,
        template: ResumeTemplate,
        config: GenerationConfig,
    ) -> Self {
        Self {
            llm,
            store,
            compiler: None,
            template,
            config,
        }
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn DocumentCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Runs the pipeline for one request and stores the result.
    pub async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<GeneratedResumeRow, GenerationError> {
        let GenerateRequest {
            user_id,
            profile_id,
            job_description,
        } = request;

        let aggregate = self
            .store
            .load_profile_aggregate(user_id, profile_id)
            .await?
            .ok_or(GenerationError::MissingAggregateData {
                user_id,
                profile_id,
            })?;

        debug!("Resume for user {user_id}: {}", GenerationStage::BuildingPrompt);
        let completion_request = CompletionRequest {
            system: RESUME_WRITER_SYSTEM.to_string(),
            prompt: build_prompt(&aggregate, &job_description),
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Resume for user {user_id}: {}", GenerationStage::AwaitingCompletion);
        let started = Instant::now();
        let result = self.llm.complete(&completion_request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.record_llm_request(user_id, elapsed_ms, &result).await;

        let completion = result.inspect_err(|e| {
            error!("LLM completion failed for user {user_id} after {elapsed_ms}ms: {e}");
        })?;
        info!(
            "LLM completion for user {user_id}: {} chars in {elapsed_ms}ms",
            completion.text.len()
        );

        let latex = self.render_document(&aggregate, &completion.text);

        debug!("Resume for user {user_id}: {}", GenerationStage::Validating);
        let issues = validate(&latex);
        for issue in &issues {
            warn!("Generated LaTeX for user {user_id}: {issue}");
        }

        let resume_id = Uuid::new_v4();
        let pdf_file_path = self.compile(resume_id, &latex).await;

        let inserted = self
            .store
            .insert_resume(NewResume {
                id: resume_id,
                user_id,
                profile_id,
                job_description,
                latex_content: latex,
                pdf_file_path: pdf_file_path.clone(),
            })
            .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) => {
                if let Some(artifact) = &pdf_file_path {
                    self.discard(artifact).await;
                }
                return Err(e.into());
            }
        };

        info!(
            "Resume {} {} for user {user_id} ({} validation issues)",
            row.id,
            GenerationStage::Persisted,
            issues.len()
        );
        Ok(row)
    }

    /// Turns a raw completion into the finished document. Pure.
    pub fn render_document(&self, aggregate: &ProfileAggregate, completion: &str) -> String {
        debug!("{}", GenerationStage::ParsingSections);
        let sections = parse_sections(completion);

        debug!("{}", GenerationStage::FormattingEntries);
        let education = EntryFormatter::EDUCATION
            .format(sections.get(Section::Education), &aggregate.education);
        let experience = EntryFormatter::EXPERIENCE
            .format(sections.get(Section::Experience), &aggregate.experience);
        let projects = EntryFormatter::PROJECTS
            .format(sections.get(Section::Projects), &aggregate.projects);
        let skills = format_skills(sections.get(Section::Skills), &aggregate.skills);

        debug!("{}", GenerationStage::PopulatingTemplate);
        let values = TemplateValues {
            user_name: template::user_name(&aggregate.user.full_name()),
            user_email: template::user_email(&aggregate.user.email),
            contact_links: template::contact_links(&aggregate.profile),
            profile_section: template::profile_section(&escape_latex(Some(
                sections.get(Section::Profile),
            ))),
            education_section: template::entry_section("Education", &education),
            experience_section: template::entry_section("Experience", &experience),
            projects_section: template::entry_section("Projects", &projects),
            skills_section: template::skills_section(&skills),
        };
        self.template.render(&values)
    }

    /// Best effort: `None` when compilation is disabled or fails.
    async fn compile(&self, resume_id: Uuid, latex: &str) -> Option<String> {
        let compiler = self.compiler.as_ref()?;
        debug!("Resume {resume_id}: {}", GenerationStage::Compiling);
        match compiler.compile(&resume_id.to_string(), latex).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("PDF compilation failed for resume {resume_id}: {e}");
                None
            }
        }
    }

    /// Best effort: a leftover artifact is logged, the insert error still wins.
    async fn discard(&self, artifact: &str) {
        let Some(compiler) = self.compiler.as_ref() else {
            return;
        };
        if let Err(e) = compiler.discard(artifact).await {
            warn!("Failed to discard orphaned artifact {artifact}: {e}");
        }
    }

    /// Logging the call must never fail the request.
    async fn record_llm_request(
        &self,
        user_id: Uuid,
        response_time_ms: u64,
        result: &Result<Completion, LlmError>,
    ) {
        let usage = result.as_ref().ok().and_then(|c| c.usage);
        let record = LlmRequestRecord {
            user_id,
            prompt_tokens: usage.map(|u| u.prompt_tokens),
            completion_tokens: usage.map(|u| u.completion_tokens),
            total_tokens: usage.map(|u| u.total_tokens),
            model_used: self.config.model.clone(),
            response_time_ms,
            status: match result {
                Ok(_) => LlmRequestStatus::Success,
                Err(_) => LlmRequestStatus::Failed,
            },
            error_message: result.as_ref().err().map(ToString::to_string),
        };

        if let Err(e) = self.store.log_llm_request(&record).await {
            warn!("Failed to log LLM request for user {user_id}: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm_client::Usage;
    use crate::models::profile::fixtures;
    use crate::resume::compiler::CompileError;
    use crate::resume::store::memory::MemoryStore;
    use crate::resume::template::Placeholder;

    enum Reply {
        Text(&'static str),
        Unauthorized,
    }

    struct FakeLlm {
        reply: Reply,
        calls: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeLlm {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for FakeLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            match self.reply {
                Reply::Text(text) => Ok(Completion {
                    text: text.to_string(),
                    usage: Some(Usage {
                        prompt_tokens: 120,
                        completion_tokens: 30,
                        total_tokens: 150,
                    }),
                }),
                Reply::Unauthorized => Err(LlmError::Api {
                    status: 401,
                    message: "Incorrect API key provided".to_string(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct FakeCompiler {
        fail: bool,
        discarded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentCompiler for FakeCompiler {
        async fn compile(&self, resume_key: &str, _latex: &str) -> Result<String, CompileError> {
            if self.fail {
                return Err(CompileError::Failed {
                    status: "exit status: 1".to_string(),
                    log_tail: "! Undefined control sequence.".to_string(),
                });
            }
            Ok(format!("resumes/{resume_key}.pdf"))
        }

        async fn discard(&self, artifact: &str) -> Result<(), CompileError> {
            self.discarded.lock().unwrap().push(artifact.to_string());
            Ok(())
        }
    }

    fn generator(llm: Arc<FakeLlm>, store: Arc<MemoryStore>) -> ResumeGenerator {
        ResumeGenerator::new(
            llm,
            store,
            ResumeTemplate::builtin().unwrap(),
            GenerationConfig::default(),
        )
    }

    fn request_for(aggregate: &ProfileAggregate) -> GenerateRequest {
        GenerateRequest {
            user_id: aggregate.user.id,
            profile_id: aggregate.profile.id,
            job_description: "  Backend engineer, Rust & Postgres  ".to_string(),
        }
    }

    #[tokio::test]
    async fn test_profile_only_completion_uses_fallback_education() {
        let mut aggregate = fixtures::aggregate();
        aggregate
            .education
            .push(fixtures::education("State University", "BS"));
        let store = Arc::new(MemoryStore::with_aggregate(aggregate.clone()));
        let llm = FakeLlm::new(Reply::Text("PROFILE:\nA driven engineer."));

        let row = generator(llm, store.clone())
            .generate(request_for(&aggregate))
            .await
            .unwrap();
        let latex = &row.latex_content;
        let body = &latex[latex.find("\\begin{document}").unwrap()..];

        assert!(body.contains("\\section{Summary}\n  {\\small A driven engineer.}"));
        assert!(body.contains("\\section{Education}"));
        assert!(body.contains("{State University}"));
        assert!(body.contains("{BS}"));
        assert_eq!(body.matches("\\resumeSubheading").count(), 1);
        assert!(!body.contains("\\resumeItemListStart"));
        assert!(!body.contains("\\section{Experience}"));
        assert!(!body.contains("\\section{Projects}"));
        assert!(!body.contains("\\section{Technical Skills}"));
        for placeholder in Placeholder::ALL {
            assert!(!latex.contains(placeholder.token()), "{placeholder} left behind");
        }
        assert!(!latex.contains("\\textbackslash{}"));
        assert!(validate(latex).is_empty());

        assert_eq!(row.job_description, "  Backend engineer, Rust & Postgres  ");
        assert_eq!(store.resumes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_full_completion_is_escaped_and_formatted() {
        let aggregate = fixtures::aggregate();
        let store = Arc::new(MemoryStore::with_aggregate(aggregate.clone()));
        let llm = FakeLlm::new(Reply::Text(
            "PROFILE:\nEngineer focused on R&D.\n\
             EXPERIENCE:\nAcme Corp - Senior Engineer (Jan 2020 - Present)\n\
             - Cut latency by 40%\n\
             SKILLS:\nLanguages: Rust, C#",
        ));

        let row = generator(llm, store)
            .generate(request_for(&aggregate))
            .await
            .unwrap();
        let latex = &row.latex_content;

        assert!(latex.contains("Engineer focused on R\\&D."));
        assert!(latex.contains("{Acme Corp}"));
        assert!(latex.contains("\\resumeItem{Cut latency by 40\\%}"));
        assert!(latex.contains("\\textbf{Languages}{: Rust, C\\#}"));
        assert!(!latex.contains("\\section{Education}"));
        assert!(validate(latex).is_empty());
    }

    #[tokio::test]
    async fn test_request_carries_configuration_and_system_prompt() {
        let aggregate = fixtures::aggregate();
        let store = Arc::new(MemoryStore::with_aggregate(aggregate.clone()));
        let llm = FakeLlm::new(Reply::Text("PROFILE:\nx"));

        generator(llm.clone(), store)
            .generate(request_for(&aggregate))
            .await
            .unwrap();

        let requests = llm.requests.lock().unwrap();
        let sent = &requests[0];
        assert_eq!(sent.model, "gpt-3.5-turbo");
        assert_eq!(sent.max_tokens, 800);
        assert_eq!(sent.system, RESUME_WRITER_SYSTEM);
        assert!(sent
            .prompt
            .contains("JOB DESCRIPTION:\n  Backend engineer, Rust & Postgres  \n"));
    }

    #[tokio::test]
    async fn test_missing_aggregate_aborts_before_llm_call() {
        let store = Arc::new(MemoryStore::default());
        let llm = FakeLlm::new(Reply::Text("PROFILE:\nx"));
        let aggregate = fixtures::aggregate();

        let err = generator(llm.clone(), store.clone())
            .generate(request_for(&aggregate))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::MissingAggregateData { .. }));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert!(store.llm_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completion_failure_is_logged_and_nothing_stored() {
        let aggregate = fixtures::aggregate();
        let store = Arc::new(MemoryStore::with_aggregate(aggregate.clone()));
        let llm = FakeLlm::new(Reply::Unauthorized);

        let err = generator(llm, store.clone())
            .generate(request_for(&aggregate))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GenerationError::CompletionFailed(LlmError::Api { status: 401, .. })
        ));
        assert!(store.resumes.lock().unwrap().is_empty());

        let logged = store.llm_requests.lock().unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].status, LlmRequestStatus::Failed);
        assert_eq!(logged[0].user_id, aggregate.user.id);
        assert_eq!(logged[0].model_used, "gpt-3.5-turbo");
        assert!(logged[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("Incorrect API key"));
        assert_eq!(logged[0].total_tokens, None);
    }

    #[tokio::test]
    async fn test_successful_call_logs_token_usage() {
        let aggregate = fixtures::aggregate();
        let store = Arc::new(MemoryStore::with_aggregate(aggregate.clone()));
        let llm = FakeLlm::new(Reply::Text("PROFILE:\nx"));

        generator(llm, store.clone())
            .generate(request_for(&aggregate))
            .await
            .unwrap();

        let logged = store.llm_requests.lock().unwrap();
        assert_eq!(logged[0].status, LlmRequestStatus::Success);
        assert_eq!(logged[0].prompt_tokens, Some(120));
        assert_eq!(logged[0].total_tokens, Some(150));
        assert_eq!(logged[0].error_message, None);
    }

    #[tokio::test]
    async fn test_insert_failure_propagates() {
        let aggregate = fixtures::aggregate();
        let store = Arc::new(MemoryStore {
            fail_inserts: true,
            ..MemoryStore::with_aggregate(aggregate.clone())
        });
        let llm = FakeLlm::new(Reply::Text("PROFILE:\nx"));

        let compiler = Arc::new(FakeCompiler::default());

        let err = generator(llm, store.clone())
            .with_compiler(compiler.clone())
            .generate(request_for(&aggregate))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Persistence(_)));
        assert!(store.resumes.lock().unwrap().is_empty());

        let discarded = compiler.discarded.lock().unwrap();
        assert_eq!(discarded.len(), 1);
        assert!(discarded[0].starts_with("resumes/"));
        assert!(discarded[0].ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_stored_resume_keeps_its_artifact() {
        let aggregate = fixtures::aggregate();
        let store = Arc::new(MemoryStore::with_aggregate(aggregate.clone()));
        let llm = FakeLlm::new(Reply::Text("PROFILE:\nx"));
        let compiler = Arc::new(FakeCompiler::default());

        generator(llm, store)
            .with_compiler(compiler.clone())
            .generate(request_for(&aggregate))
            .await
            .unwrap();
        assert!(compiler.discarded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_completion_falls_back_to_stored_rows() {
        let mut aggregate = fixtures::aggregate();
        aggregate
            .education
            .push(fixtures::education("State University", "BS"));
        let store = Arc::new(MemoryStore::with_aggregate(aggregate.clone()));
        let llm = FakeLlm::new(Reply::Text(""));

        let row = generator(llm, store.clone())
            .generate(request_for(&aggregate))
            .await
            .unwrap();
        let latex = &row.latex_content;

        assert!(latex.contains("\\section{Education}"));
        assert!(latex.contains("{State University}"));
        assert!(!latex.contains("\\section{Summary}"));
        for placeholder in Placeholder::ALL {
            assert!(!latex.contains(placeholder.token()), "{placeholder} left behind");
        }
        assert_eq!(store.resumes.lock().unwrap().len(), 1);
        assert_eq!(
            store.llm_requests.lock().unwrap()[0].status,
            LlmRequestStatus::Success
        );
    }

    #[tokio::test]
    async fn test_headerless_completion_falls_back_to_stored_rows() {
        let mut aggregate = fixtures::aggregate();
        aggregate
            .experience
            .push(fixtures::experience("Acme", "Engineer"));
        aggregate.skills.push(fixtures::skill("Rust", Some("Expert")));
        let store = Arc::new(MemoryStore::with_aggregate(aggregate.clone()));
        let llm = FakeLlm::new(Reply::Text("Sure! Here is your resume."));

        let row = generator(llm, store)
            .generate(request_for(&aggregate))
            .await
            .unwrap();

        assert!(!row.latex_content.contains("\\section{Summary}"));
        assert!(!row.latex_content.contains("Sure!"));
        assert!(row.latex_content.contains("{Acme}"));
        assert!(row.latex_content.contains("Rust (Expert)"));
    }

    #[tokio::test]
    async fn test_compiled_pdf_path_is_stored() {
        let aggregate = fixtures::aggregate();
        let store = Arc::new(MemoryStore::with_aggregate(aggregate.clone()));
        let llm = FakeLlm::new(Reply::Text("PROFILE:\nx"));

        let row = generator(llm, store)
            .with_compiler(Arc::new(FakeCompiler::default()))
            .generate(request_for(&aggregate))
            .await
            .unwrap();
        assert_eq!(
            row.pdf_file_path.as_deref(),
            Some(format!("resumes/{}.pdf", row.id).as_str())
        );
    }

    #[tokio::test]
    async fn test_compile_failure_is_not_fatal() {
        let aggregate = fixtures::aggregate();
        let store = Arc::new(MemoryStore::with_aggregate(aggregate.clone()));
        let llm = FakeLlm::new(Reply::Text("PROFILE:\nx"));

        let row = generator(llm, store.clone())
            .with_compiler(Arc::new(FakeCompiler {
                fail: true,
                ..FakeCompiler::default()
            }))
            .generate(request_for(&aggregate))
            .await
            .unwrap();
        assert_eq!(row.pdf_file_path, None);
        assert_eq!(store.resumes.lock().unwrap().len(), 1);
    }
}
