// Prompt text for resume generation, plus the builder that assembles it.
// Profile fields go in raw: this is instruction input, not document output.

use chrono::NaiveDate;

use crate::models::profile::{EducationRow, ExperienceRow, ProfileAggregate, ProjectRow, SkillRow};

pub const PROMPT_PREAMBLE: &str = "\
Generate tailored resume content for the following job description, based on the candidate's profile.
THE OUTPUT MUST BE PLAIN TEXT, structured with the exact section headers (PROFILE:, EDUCATION:, EXPERIENCE:, PROJECTS:, SKILLS:) each on a new line, followed immediately by the content for that section.";

pub const CONTACT_NOTE: &str = "(User's direct contact details like email, phone, LinkedIn will be populated into the final template from the database separately. Focus on the substance of their achievements and skills.)";

/// Closing instruction block. Mandates the five-header output contract.
pub const PROMPT_INSTRUCTIONS: &str = r#"INSTRUCTIONS:
1. Analyze the JOB DESCRIPTION and the CANDIDATE PROFILE provided above.
2. Generate compelling, concise, and professional PLAIN TEXT content for each of the following sections.
3. The content for each section should be suitable for direct insertion into a resume. Use bullet points (e.g., using '-' or '*') for lists within sections like experience and projects where appropriate.
4. **CRITICALLY IMPORTANT: Structure your entire output with these exact uppercase headers, each on a new line, followed by the content for that section. Example:**
   PROFILE:
   [Text for professional summary here...]

   EDUCATION:
   [Text for education section here...]

   EXPERIENCE:
   [Text for experience section here...]

   PROJECTS:
   [Text for projects section here...]

   SKILLS:
   [Text for skills section here...]

GUIDELINES FOR EACH SECTION'S TEXTUAL CONTENT:
   - PROFILE:
     Write a 2-4 sentence professional summary tailored to the job description, highlighting key skills and experiences from the candidate's profile.

   - EDUCATION:
     For each education entry, provide institution, degree, field of study (if any), graduation date (or expected). Optionally, include 1-2 bullet points per entry for key achievements, relevant coursework, or GPA if significant and high.
     Example format for one entry's text:
     Institution Name - Degree in Field of Study (Graduation: Month Year)
     - Relevant coursework: Course A, Course B
     - GPA: 3.X/4.0

   - EXPERIENCE:
     For each experience entry, provide company, position, and dates of employment. Follow with 2-4 bullet points detailing responsibilities and achievements. Quantify achievements where possible and tailor these points to the job description.
     Example format for one entry's text:
     Company Name - Position Title (Month Year - Month Year)
     - Achieved X by implementing Y, resulting in Z impact (e.g., 15% improvement in Q).
     - Led a team to develop a new feature, enhancing user engagement.

   - PROJECTS:
     For each project, provide the project title and optionally dates. Follow with 1-3 bullet points describing the project, technologies used, your role, and key outcomes or impact.
     Example format for one entry's text:
     Project Title (Optional: Month Year - Month Year)
     - Developed X using Y (e.g., Python, React) and Z (e.g., PostgreSQL).
     - Implemented feature A which resulted in B (e.g., reduced processing time by 10%).

   - SKILLS:
     Provide a categorized list of skills. Examples of categories: Programming Languages, Frameworks & Libraries, Databases, Tools, Cloud Platforms, Other Technical Skills, Soft Skills.
     Example format for the skills text:
     Programming Languages: Python, Java, JavaScript
     Frameworks & Libraries: React, Node.js, Spring Boot
     Databases: PostgreSQL, MongoDB
     Tools: Git, Docker, Kubernetes

5. **DO NOT** include any LaTeX commands (e.g., \section, \textbf, \item).
6. **DO NOT** include any explanations, apologies, or conversational text outside of the requested section content. Output only the structured resume content starting with "PROFILE:".
7. Ensure each section header (PROFILE:, EDUCATION:, etc.) is ON ITS OWN LINE."#;

/// Builds the user prompt for one generation request. Pure and deterministic.
pub fn build_prompt(aggregate: &ProfileAggregate, job_description: &str) -> String {
    let sections = [
        ("EDUCATION", format_education(&aggregate.education)),
        ("EXPERIENCE", format_experience(&aggregate.experience)),
        ("PROJECTS", format_projects(&aggregate.projects)),
        ("SKILLS", format_skills(&aggregate.skills)),
    ];

    let mut prompt = String::new();
    prompt.push_str(PROMPT_PREAMBLE);
    prompt.push_str("\n\nJOB DESCRIPTION:\n");
    prompt.push_str(job_description);
    prompt.push_str("\n\nCANDIDATE PROFILE FOR: ");
    prompt.push_str(&aggregate.candidate_name());
    prompt.push('\n');
    prompt.push_str(CONTACT_NOTE);
    for (header, body) in sections {
        prompt.push_str(&format!("\n\n{header}:\n{body}"));
    }
    prompt.push_str("\n\n");
    prompt.push_str(PROMPT_INSTRUCTIONS);
    prompt.push('\n');
    prompt
}

fn format_education(rows: &[EducationRow]) -> String {
    if rows.is_empty() {
        return "No education data provided.".to_string();
    }
    rows.iter()
        .map(|edu| {
            let mut parts = vec![
                format!("- Institution: {}", edu.institution),
                format!("  Degree: {}", edu.degree.as_deref().unwrap_or("N/A")),
            ];
            if let Some(field) = present(edu.field_of_study.as_deref()) {
                parts.push(format!("  Field of Study: {field}"));
            }
            if let Some(dates) = prompt_dates(edu.start_date, edu.end_date) {
                parts.push(format!("  Dates: {dates}"));
            }
            if let Some(details) = bullet_lines(edu.description.as_deref()) {
                parts.push(format!(
                    "  Details (to be elaborated by LLM or used as bullet points):\n{details}"
                ));
            }
            parts.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_experience(rows: &[ExperienceRow]) -> String {
    if rows.is_empty() {
        return "No experience data provided.".to_string();
    }
    rows.iter()
        .map(|exp| {
            let mut parts = vec![
                format!("- Company: {}", exp.company),
                format!("  Position: {}", exp.position),
            ];
            if let Some(dates) = prompt_dates(exp.start_date, exp.end_date) {
                parts.push(format!("  Dates: {dates}"));
            }
            if let Some(details) = bullet_lines(exp.description.as_deref()) {
                parts.push(format!(
                    "  Responsibilities/Achievements (to be elaborated by LLM as bullet points):\n{details}"
                ));
            }
            parts.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_projects(rows: &[ProjectRow]) -> String {
    if rows.is_empty() {
        return "No projects data provided.".to_string();
    }
    rows.iter()
        .map(|proj| {
            let mut parts = vec![format!("- Title: {}", proj.title)];
            if let Some(dates) = prompt_dates(proj.start_date, proj.end_date) {
                parts.push(format!("  Dates: {dates}"));
            }
            if let Some(details) = bullet_lines(proj.description.as_deref()) {
                parts.push(format!(
                    "  Description (to be elaborated by LLM as bullet points):\n{details}"
                ));
            }
            if let Some(tech) = present(proj.technologies.as_deref()) {
                parts.push(format!("  Technologies: {tech}"));
            }
            parts.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// Skills go in as a flat list; the model is asked to categorize them.
fn format_skills(rows: &[SkillRow]) -> String {
    if rows.is_empty() {
        return "No skills data provided.".to_string();
    }
    rows.iter()
        .map(|skill| match present(skill.proficiency.as_deref()) {
            Some(level) => format!("- {} (Proficiency: {level})", skill.name),
            None => format!("- {}", skill.name),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn prompt_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<String> {
    let dates: Vec<String> = [start, end].into_iter().flatten().map(|d| d.to_string()).collect();
    (!dates.is_empty()).then(|| dates.join(" - "))
}

/// Each non-blank description line as an indented `- ` bullet.
fn bullet_lines(text: Option<&str>) -> Option<String> {
    let lines: Vec<String> = text?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!("    - {l}"))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
