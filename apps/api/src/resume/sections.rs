//! Splits one LLM completion into the five named resume sections.

use std::fmt;

use serde::Serialize;
use tracing::{error, warn};

/// The sections the model is instructed to emit, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Section {
    Profile,
    Education,
    Experience,
    Projects,
    Skills,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Profile,
        Section::Education,
        Section::Experience,
        Section::Projects,
        Section::Skills,
    ];

    /// Uppercase header name, without the colon.
    pub fn header(&self) -> &'static str {
        match self {
            Section::Profile => "PROFILE",
            Section::Education => "EDUCATION",
            Section::Experience => "EXPERIENCE",
            Section::Projects => "PROJECTS",
            Section::Skills => "SKILLS",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    /// Matches `NAME:` at the start of a trimmed line, ignoring case.
    /// Returns the section and whatever follows the colon.
    fn match_header(line: &str) -> Option<(Section, &str)> {
        Section::ALL.into_iter().find_map(|section| {
            let name = section.header();
            let prefix = line.get(..name.len())?;
            if !prefix.eq_ignore_ascii_case(name) {
                return None;
            }
            line[name.len()..].strip_prefix(':').map(|rest| (section, rest))
        })
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Total map from every `Section` to its text. Missing sections hold `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    content: [String; 5],
}

impl SectionMap {
    pub fn get(&self, section: Section) -> &str {
        &self.content[section.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.content.iter().all(String::is_empty)
    }

    fn store(&mut self, section: Section, lines: &[&str]) {
        let text = lines.join("\n");
        let text = text.trim();
        // A repeated header with no content never erases earlier content.
        if !text.is_empty() {
            self.content[section.index()] = text.to_string();
        }
    }
}

/// Parses a raw completion into a `SectionMap`.
///
/// Header lines (`NAME:` at line start, any case) switch the current section and
/// may carry content after the colon. Blank lines are dropped. Text before the
/// first header is ignored; a completion with no header at all yields an empty map.
pub fn parse_sections(raw: &str) -> SectionMap {
    let mut sections = SectionMap::default();
    let mut current: Option<Section> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for line in raw.lines() {
        let stripped = line.trim();

        if let Some((section, rest)) = Section::match_header(stripped) {
            if let Some(open) = current {
                sections.store(open, &buffer);
            }
            buffer.clear();
            current = Some(section);

            let rest = rest.trim();
            if !rest.is_empty() {
                buffer.push(rest);
            }
            continue;
        }

        if current.is_some() && !stripped.is_empty() {
            buffer.push(stripped);
        }
    }

    if let Some(open) = current {
        sections.store(open, &buffer);
    }

    if sections.is_empty() {
        if raw.trim().is_empty() {
            error!("LLM output was empty. Could not parse into sections.");
        } else {
            error!(
                "Could not parse LLM output into any known sections; discarding {} bytes",
                raw.len()
            );
        }
        return sections;
    }

    for section in Section::ALL {
        if sections.get(section).is_empty() {
            warn!("Section '{section}' was not found or is empty in LLM output");
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDEAL: &str = r#"
PROFILE:
This is the profile summary.
It spans multiple lines.

EDUCATION:
University of Hard Knocks - PhD in Street Smarts (Jan 2010 - Dec 2014)
- Learned a lot.

EXPERIENCE:
Big Corp - Senior Developer (Jun 2015 - Present)
- Did amazing things with code.

PROJECTS:
Cool Project (Jan 2023 - Mar 2023)
- Built a thing using Python and Flask.

SKILLS:
Programming Languages: Python, JavaScript
Databases: PostgreSQL
"#;

    fn assert_all_empty(map: &SectionMap) {
        for section in Section::ALL {
            assert_eq!(map.get(section), "", "{section} should be empty");
        }
    }

    #[test]
    fn test_empty_and_whitespace_input_yield_all_empty() {
        assert_all_empty(&parse_sections(""));
        assert_all_empty(&parse_sections("   \n\n\t  \n"));
    }

    #[test]
    fn test_ideal_output_populates_every_section() {
        let map = parse_sections(IDEAL);
        assert_eq!(
            map.get(Section::Profile),
            "This is the profile summary.\nIt spans multiple lines."
        );
        assert!(map.get(Section::Education).starts_with("University of Hard Knocks"));
        assert_eq!(
            map.get(Section::Experience),
            "Big Corp - Senior Developer (Jun 2015 - Present)\n- Did amazing things with code."
        );
        assert!(map.get(Section::Projects).contains("Flask"));
        assert_eq!(
            map.get(Section::Skills),
            "Programming Languages: Python, JavaScript\nDatabases: PostgreSQL"
        );
    }

    #[test]
    fn test_header_matching_ignores_case() {
        let upper = parse_sections("PROFILE:\nX");
        let lower = parse_sections("profile:\nX");
        let mixed = parse_sections("  Profile:\nX");
        assert_eq!(upper.get(Section::Profile), "X");
        assert_eq!(lower.get(Section::Profile), upper.get(Section::Profile));
        assert_eq!(mixed.get(Section::Profile), upper.get(Section::Profile));
    }

    #[test]
    fn test_any_subset_in_any_order() {
        let map = parse_sections("SKILLS:\nRust\nEDUCATION:\nMIT - BS\nPROFILE:\nHi");
        assert_eq!(map.get(Section::Skills), "Rust");
        assert_eq!(map.get(Section::Education), "MIT - BS");
        assert_eq!(map.get(Section::Profile), "Hi");
        assert_eq!(map.get(Section::Experience), "");
        assert_eq!(map.get(Section::Projects), "");
    }

    #[test]
    fn test_content_on_header_line_is_kept() {
        let map = parse_sections(
            "PROFILE:This is a profile summary.\nSKILLS:Skill1, Skill2\nEXPERIENCE:  Job Co - Worker",
        );
        assert_eq!(map.get(Section::Profile), "This is a profile summary.");
        assert_eq!(map.get(Section::Skills), "Skill1, Skill2");
        assert_eq!(map.get(Section::Experience), "Job Co - Worker");
    }

    #[test]
    fn test_blank_lines_inside_section_are_dropped() {
        let map = parse_sections("PROFILE:\nLine one\n\n   \nLine two");
        assert_eq!(map.get(Section::Profile), "Line one\nLine two");
    }

    #[test]
    fn test_header_must_start_the_line() {
        let map = parse_sections("PROFILE:\nSee my SKILLS: below\nEXPERIENCE is mentioned");
        assert_eq!(
            map.get(Section::Profile),
            "See my SKILLS: below\nEXPERIENCE is mentioned"
        );
        assert_eq!(map.get(Section::Skills), "");
        assert_eq!(map.get(Section::Experience), "");
    }

    #[test]
    fn test_name_without_colon_is_not_a_header() {
        let map = parse_sections("PROFILE:\nEducation\nSkills matter");
        assert_eq!(map.get(Section::Profile), "Education\nSkills matter");
    }

    #[test]
    fn test_no_recognisable_header_discards_everything() {
        let map = parse_sections("Here is your resume!\nJane is a great engineer.");
        assert_all_empty(&map);
    }

    #[test]
    fn test_preamble_before_first_header_is_ignored() {
        let map = parse_sections("Sure, here you go:\nPROFILE:\nSummary");
        assert_eq!(map.get(Section::Profile), "Summary");
    }

    #[test]
    fn test_repeated_empty_header_keeps_earlier_content() {
        let map = parse_sections("SKILLS:\nRust\nSKILLS:\nPROFILE:\nHi");
        assert_eq!(map.get(Section::Skills), "Rust");
        assert_eq!(map.get(Section::Profile), "Hi");
    }

    #[test]
    fn test_non_ascii_line_does_not_panic_on_prefix_slice() {
        let map = parse_sections("PROFILE:\nÉcole — Paris\nпрофиль: нет");
        assert_eq!(map.get(Section::Profile), "École — Paris\nпрофиль: нет");
    }
}
