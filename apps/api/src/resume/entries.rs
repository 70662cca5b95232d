//! Entry formatting: turns one section's free text into LaTeX entry blocks.
//!
//! The free-text path is a heuristic, forward-only line scanner. It will misparse
//! unusual phrasing; the database fallback (used whenever the section text is
//! blank) is the correctness safety net.
//!
//! Every field is escaped exactly once, at render time.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::profile::{EducationRow, ExperienceRow, ProjectRow, SkillRow};
use crate::resume::escape::escape_latex;

/// Words that mark an education headline ("State University - BS").
const INSTITUTION_CUES: &[&str] = &["university", "college", "institute", "school", "academy"];

const HEADLINE_SEPARATOR: &str = " - ";

// ────────────────────────────────────────────────────────────────────────────
// Entry model
// ────────────────────────────────────────────────────────────────────────────

/// One degree, job or project, before escaping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// Institution, company or project title.
    pub headline: String,
    /// Degree or position line. Projects leave this empty.
    pub detail: Option<String>,
    pub date_range: Option<String>,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Education,
    Experience,
    Projects,
}

/// Scanner accumulator: either no entry is open yet, or one is collecting bullets.
enum ScanState {
    AwaitingHeadline,
    Accumulating(Entry),
}

// ────────────────────────────────────────────────────────────────────────────
// Formatter
// ────────────────────────────────────────────────────────────────────────────

/// Renders one entity kind's section. One instance per kind.
#[derive(Debug, Clone, Copy)]
pub struct EntryFormatter {
    kind: EntryKind,
}

impl EntryFormatter {
    pub const EDUCATION: EntryFormatter = EntryFormatter {
        kind: EntryKind::Education,
    };
    pub const EXPERIENCE: EntryFormatter = EntryFormatter {
        kind: EntryKind::Experience,
    };
    pub const PROJECTS: EntryFormatter = EntryFormatter {
        kind: EntryKind::Projects,
    };

    /// Renders `section_text`, or `fallback_rows` when the text is blank.
    /// Returns `""` when there is nothing to render.
    pub fn format<R: FallbackEntry>(&self, section_text: &str, fallback_rows: &[R]) -> String {
        let entries = if section_text.trim().is_empty() {
            fallback_rows.iter().map(FallbackEntry::to_entry).collect()
        } else {
            self.parse(section_text)
        };
        self.render(&entries)
    }

    /// Scans free text into entries, in arrival order.
    pub fn parse(&self, section_text: &str) -> Vec<Entry> {
        let mut entries = Vec::new();
        let mut state = ScanState::AwaitingHeadline;

        for line in section_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(bullet) = strip_bullet_marker(line) {
                // Bullets before the first headline have nowhere to go.
                if let ScanState::Accumulating(entry) = &mut state {
                    if !bullet.is_empty() {
                        entry.bullets.push(bullet.to_string());
                    }
                }
                continue;
            }

            if !self.starts_entry(line) {
                continue;
            }

            if let ScanState::Accumulating(done) =
                std::mem::replace(&mut state, ScanState::Accumulating(self.headline(line)))
            {
                entries.push(done);
            }
        }

        if let ScanState::Accumulating(done) = state {
            entries.push(done);
        }
        entries
    }

    fn starts_entry(&self, line: &str) -> bool {
        match self.kind {
            EntryKind::Education => {
                let lower = line.to_lowercase();
                line.contains(HEADLINE_SEPARATOR)
                    && INSTITUTION_CUES.iter().any(|cue| lower.contains(cue))
            }
            EntryKind::Experience => line.contains(HEADLINE_SEPARATOR),
            EntryKind::Projects => true,
        }
    }

    /// Builds a bullet-less entry from a headline line.
    fn headline(&self, line: &str) -> Entry {
        let (text, date_group) = extract_date_group(line);
        let date_range = date_group.and_then(|group| match self.kind {
            // Education keeps only the graduation year: the last year in the
            // group, so "2018 - 2022" yields 2022 rather than the start year.
            EntryKind::Education => last_year(&group),
            EntryKind::Experience | EntryKind::Projects => Some(group),
        });

        let (headline, detail) = match self.kind {
            EntryKind::Projects => (clean_fragment(&text), None),
            EntryKind::Education | EntryKind::Experience => match text.split_once(HEADLINE_SEPARATOR)
            {
                Some((head, rest)) => (clean_fragment(head), Some(clean_fragment(rest))),
                None => (clean_fragment(&text), None),
            },
        };

        Entry {
            headline,
            detail: detail.filter(|d| !d.is_empty()),
            date_range,
            bullets: Vec::new(),
        }
    }

    /// Renders entries as LaTeX blocks joined by newlines.
    pub fn render(&self, entries: &[Entry]) -> String {
        entries
            .iter()
            .map(|entry| self.render_entry(entry))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_entry(&self, entry: &Entry) -> String {
        let headline = escape_latex(Some(entry.headline.as_str()));
        let detail = escape_latex(entry.detail.as_deref());
        let dates = escape_latex(entry.date_range.as_deref());

        let (mut block, list_start, item, list_end) = match self.kind {
            EntryKind::Education | EntryKind::Experience => (
                format!("    \\resumeSubheading\n      {{{headline}}}{{}}\n      {{{detail}}}{{{dates}}}"),
                "\\resumeItemListStart",
                "\\resumeItem",
                "\\resumeItemListEnd",
            ),
            EntryKind::Projects => (
                format!("    \\resumeProjectHeading\n      {{\\textbf{{{headline}}}}}{{{dates}}}"),
                "\\resumeItemListStartNoSpace",
                "\\resumeItemNoSpace",
                "\\resumeItemListEndNoSpace",
            ),
        };

        let bullets: Vec<String> = entry
            .bullets
            .iter()
            .map(|b| escape_latex(Some(b.as_str())))
            .filter(|b| !b.is_empty())
            .collect();

        // No bullets, no list: an empty list environment does not compile.
        if !bullets.is_empty() {
            block.push_str(&format!("\n      {list_start}"));
            for bullet in &bullets {
                block.push_str(&format!("\n          {item}{{{bullet}}}"));
            }
            block.push_str(&format!("\n      {list_end}"));
        }
        block
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Database fallback
// ────────────────────────────────────────────────────────────────────────────

/// A stored record that can stand in for an LLM-written entry.
pub trait FallbackEntry {
    fn to_entry(&self) -> Entry;
}

impl FallbackEntry for EducationRow {
    fn to_entry(&self) -> Entry {
        let degree = non_blank(self.degree.as_deref());
        let field = non_blank(self.field_of_study.as_deref());
        let detail = match (degree, field) {
            (Some(degree), Some(field)) => Some(format!("{degree} in {field}")),
            (Some(degree), None) => Some(degree.to_string()),
            (None, Some(field)) => Some(field.to_string()),
            (None, None) => None,
        };
        Entry {
            headline: self.institution.trim().to_string(),
            detail,
            date_range: format_date_range(self.start_date, self.end_date),
            bullets: description_bullet(self.description.as_deref())
                .into_iter()
                .collect(),
        }
    }
}

impl FallbackEntry for ExperienceRow {
    fn to_entry(&self) -> Entry {
        Entry {
            headline: self.company.trim().to_string(),
            detail: non_blank(Some(self.position.as_str())).map(str::to_string),
            date_range: format_date_range(self.start_date, self.end_date),
            bullets: description_bullet(self.description.as_deref())
                .into_iter()
                .collect(),
        }
    }
}

impl FallbackEntry for ProjectRow {
    fn to_entry(&self) -> Entry {
        let mut bullets: Vec<String> = description_bullet(self.description.as_deref())
            .into_iter()
            .collect();
        if let Some(tech) = non_blank(self.technologies.as_deref()) {
            bullets.push(format!("Technologies: {tech}"));
        }
        Entry {
            headline: self.title.trim().to_string(),
            detail: None,
            date_range: format_date_range(self.start_date, self.end_date),
            bullets,
        }
    }
}

/// `Sep 2018 -- May 2022`; a missing end date reads `Present`.
pub fn format_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<String> {
    let fmt = |d: NaiveDate| d.format("%b %Y").to_string();
    match (start, end) {
        (None, None) => None,
        (Some(start), None) => Some(format!("{} -- Present", fmt(start))),
        (None, Some(end)) => Some(fmt(end)),
        (Some(start), Some(end)) => Some(format!("{} -- {}", fmt(start), fmt(end))),
    }
}

/// A stored description becomes one bullet with its whitespace collapsed.
fn description_bullet(description: Option<&str>) -> Option<String> {
    let collapsed = description?.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

// ────────────────────────────────────────────────────────────────────────────
// Skills
// ────────────────────────────────────────────────────────────────────────────

/// Renders the skills section body: one LaTeX line per skills line, with a bold
/// category when the line reads `Category: a, b`. Blank text falls back to the
/// stored skill rows.
pub fn format_skills(section_text: &str, fallback_rows: &[SkillRow]) -> String {
    if section_text.trim().is_empty() {
        let skills = fallback_rows
            .iter()
            .filter_map(|row| {
                let name = non_blank(Some(row.name.as_str()))?;
                Some(match non_blank(row.proficiency.as_deref()) {
                    Some(level) => format!("{name} ({level})"),
                    None => name.to_string(),
                })
            })
            .collect::<Vec<_>>()
            .join(", ");
        return escape_latex(Some(skills.as_str()));
    }

    section_text
        .lines()
        .map(str::trim)
        .map(|line| strip_bullet_marker(line).unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(':') {
            Some((category, items)) if !category.trim().is_empty() && !items.trim().is_empty() => {
                format!(
                    "\\textbf{{{}}}{{: {}}}",
                    escape_latex(Some(category)),
                    escape_latex(Some(items))
                )
            }
            _ => escape_latex(Some(line)),
        })
        .collect::<Vec<_>>()
        .join(" \\\\\n     ")
}

// ────────────────────────────────────────────────────────────────────────────
// Line helpers
// ────────────────────────────────────────────────────────────────────────────

fn strip_bullet_marker(line: &str) -> Option<&str> {
    line.strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))
        .map(str::trim)
}

/// Removes the first parenthesised group that contains a four-digit year.
/// Returns the remaining text and the group's trimmed content.
fn extract_date_group(line: &str) -> (String, Option<String>) {
    static DATE_GROUP_RE: OnceLock<Regex> = OnceLock::new();
    let re = DATE_GROUP_RE.get_or_init(|| Regex::new(r"\(([^()]*?\b\d{4}\b[^()]*)\)").unwrap());

    match re.captures(line) {
        Some(caps) => {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let inner = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
            (line.replacen(whole, "", 1), Some(inner))
        }
        None => (line.to_string(), None),
    }
}

fn last_year(text: &str) -> Option<String> {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    let re = YEAR_RE.get_or_init(|| Regex::new(r"\b\d{4}\b").unwrap());
    re.find_iter(text).last().map(|m| m.as_str().to_string())
}

/// Collapses whitespace and drops trailing separators left behind by date removal.
fn clean_fragment(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c| c == ',' || c == ';')
        .trim()
        .to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
