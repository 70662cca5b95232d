//! Resume template: closed placeholder set and single-pass literal substitution.
//!
//! Each placeholder must occur exactly once in the template. That is checked once,
//! when the template is loaded; rendering cannot leave a placeholder behind or
//! substitute one twice. Inserted text is never rescanned, so content that happens
//! to contain a token like `[SKILLS_SECTION]` is inserted verbatim.

use std::fmt;

use thiserror::Error;

use crate::models::profile::ProfileRow;
use crate::resume::escape::escape_latex;

/// The built-in one-page template.
pub const RESUME_TEMPLATE: &str = include_str!("../../templates/resume_template.tex");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    UserName,
    UserEmail,
    ContactLinks,
    ProfileSection,
    EducationSection,
    ExperienceSection,
    ProjectsSection,
    SkillsSection,
}

impl Placeholder {
    pub const ALL: [Placeholder; 8] = [
        Placeholder::UserName,
        Placeholder::UserEmail,
        Placeholder::ContactLinks,
        Placeholder::ProfileSection,
        Placeholder::EducationSection,
        Placeholder::ExperienceSection,
        Placeholder::ProjectsSection,
        Placeholder::SkillsSection,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::UserName => "[USER_NAME]",
            Placeholder::UserEmail => "[USER_EMAIL]",
            Placeholder::ContactLinks => "[CONTACT_LINKS]",
            Placeholder::ProfileSection => "[PROFILE_SECTION]",
            Placeholder::EducationSection => "[EDUCATION_SECTION]",
            Placeholder::ExperienceSection => "[EXPERIENCE_SECTION]",
            Placeholder::ProjectsSection => "[PROJECTS_SECTION]",
            Placeholder::SkillsSection => "[SKILLS_SECTION]",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template is missing placeholder {0}")]
    Missing(Placeholder),

    #[error("template contains placeholder {placeholder} {count} times; expected exactly once")]
    Duplicated { placeholder: Placeholder, count: usize },
}

/// Already-rendered LaTeX for every placeholder. Struct fields rather than a map,
/// so a forgotten placeholder is a compile error.
#[derive(Debug, Clone, Default)]
pub struct TemplateValues {
    pub user_name: String,
    pub user_email: String,
    pub contact_links: String,
    pub profile_section: String,
    pub education_section: String,
    pub experience_section: String,
    pub projects_section: String,
    pub skills_section: String,
}

impl TemplateValues {
    fn get(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::UserName => &self.user_name,
            Placeholder::UserEmail => &self.user_email,
            Placeholder::ContactLinks => &self.contact_links,
            Placeholder::ProfileSection => &self.profile_section,
            Placeholder::EducationSection => &self.education_section,
            Placeholder::ExperienceSection => &self.experience_section,
            Placeholder::ProjectsSection => &self.projects_section,
            Placeholder::SkillsSection => &self.skills_section,
        }
    }
}

/// A validated template: the source plus the byte offset of every placeholder.
#[derive(Debug, Clone)]
pub struct ResumeTemplate {
    source: String,
    /// Sorted by offset.
    slots: Vec<(usize, Placeholder)>,
}

impl ResumeTemplate {
    pub fn parse(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        let mut slots = Vec::with_capacity(Placeholder::ALL.len());

        for placeholder in Placeholder::ALL {
            let offsets: Vec<usize> = source
                .match_indices(placeholder.token())
                .map(|(offset, _)| offset)
                .collect();
            match offsets.as_slice() {
                [] => return Err(TemplateError::Missing(placeholder)),
                [offset] => slots.push((*offset, placeholder)),
                _ => {
                    return Err(TemplateError::Duplicated {
                        placeholder,
                        count: offsets.len(),
                    })
                }
            }
        }

        slots.sort_by_key(|(offset, _)| *offset);
        Ok(Self { source, slots })
    }

    pub fn builtin() -> Result<Self, TemplateError> {
        Self::parse(RESUME_TEMPLATE)
    }

    /// Substitutes every placeholder exactly once, in a single pass.
    pub fn render(&self, values: &TemplateValues) -> String {
        let mut out = String::with_capacity(self.source.len() * 2);
        let mut cursor = 0;
        for (offset, placeholder) in &self.slots {
            out.push_str(&self.source[cursor..*offset]);
            out.push_str(values.get(*placeholder));
            cursor = offset + placeholder.token().len();
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Section wrappers
// ────────────────────────────────────────────────────────────────────────────
//
// A section with no content renders as nothing at all: an empty itemize does
// not compile.

/// `summary` must already be escaped.
pub fn profile_section(summary: &str) -> String {
    if summary.is_empty() {
        return String::new();
    }
    format!("\\section{{Summary}}\n  {{\\small {summary}}}")
}

/// Wraps rendered entry blocks in a titled sub-heading list.
pub fn entry_section(title: &str, entries: &str) -> String {
    if entries.is_empty() {
        return String::new();
    }
    format!(
        "\\section{{{title}}}\n  \\resumeSubHeadingListStart\n{entries}\n  \\resumeSubHeadingListEnd"
    )
}

pub fn skills_section(skills: &str) -> String {
    if skills.is_empty() {
        return String::new();
    }
    format!(
        "\\section{{Technical Skills}}\n \\begin{{itemize}}[leftmargin=0.15in, label={{}}]\n    \\small{{\\item{{\n     {skills}\n    }}}}\n \\end{{itemize}}"
    )
}

/// Name for the header; `Your Name` when the user has none on file.
pub fn user_name(full_name: &str) -> String {
    let escaped = escape_latex(Some(full_name));
    if escaped.is_empty() {
        "Your Name".to_string()
    } else {
        escaped
    }
}

pub fn user_email(email: &str) -> String {
    let escaped = escape_latex(Some(email));
    if escaped.is_empty() {
        return String::new();
    }
    format!("\\href{{mailto:{escaped}}}{{\\underline{{{escaped}}}}}")
}

/// Optional contact links, each prefixed with a separator. Empty when none are set.
pub fn contact_links(profile: &ProfileRow) -> String {
    let mut links = String::new();
    if let Some(url) = present(profile.linkedin_url.as_deref()) {
        links.push_str(&format!(
            " \\textbar{{}} \\faLinkedin \\hspace{{.5pt}} \\href{{{}}}{{LinkedIn}}",
            escape_latex(Some(url))
        ));
    }
    if let Some(url) = present(profile.github_url.as_deref()) {
        links.push_str(&format!(
            " \\textbar{{}} \\faGithub \\hspace{{.5pt}} \\href{{{}}}{{GitHub}}",
            escape_latex(Some(url))
        ));
    }
    if let Some(location) = present(profile.location.as_deref()) {
        links.push_str(&format!(
            " \\textbar{{}} \\faMapMarker \\hspace{{.5pt}} {{{}}}",
            escape_latex(Some(location))
        ));
    }
    if let Some(phone) = present(profile.phone_number.as_deref()) {
        links.push_str(&format!(
            " \\textbar{{}} \\faPhone \\hspace{{.5pt}} {{{}}}",
            escape_latex(Some(phone))
        ));
    }
    links
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
