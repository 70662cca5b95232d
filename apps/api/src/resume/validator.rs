//! Static malformation checks on a finished LaTeX document.
//!
//! Heuristic and never blocking: callers log the issues and keep the document.

use serde::Serialize;

/// More than this many unescaped hits of one character is reported.
/// A little slack absorbs false positives.
const UNESCAPED_TOLERANCE: usize = 2;

const WATCHED_CHARS: [char; 4] = ['&', '%', '$', '#'];

/// Open/close command pairs that must balance.
const LIST_PAIRS: [(&str, &str); 4] = [
    ("\\resumeSubHeadingListStart", "\\resumeSubHeadingListEnd"),
    ("\\resumeItemListStart", "\\resumeItemListEnd"),
    ("\\resumeItemListStartNoSpace", "\\resumeItemListEndNoSpace"),
    ("\\begin{itemize}", "\\end{itemize}"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    UnescapedCharacter { character: char, count: usize },
    UnbalancedList { open: String, opens: usize, closes: usize },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::UnescapedCharacter { character, count } => {
                write!(f, "Unescaped {character} character found ({count} times)")
            }
            ValidationIssue::UnbalancedList {
                open,
                opens,
                closes,
            } => write!(
                f,
                "Mismatched list environments for {open}: {opens} starts vs {closes} ends"
            ),
        }
    }
}

/// Scans the document body (everything after `\begin{document}`, or the whole
/// input if there is none) and returns what looks wrong. Empty means clean.
pub fn validate(markup: &str) -> Vec<ValidationIssue> {
    let body = match markup.find("\\begin{document}") {
        Some(start) => &markup[start..],
        None => markup,
    };

    let mut issues = Vec::new();

    for character in WATCHED_CHARS {
        let count = count_unescaped(body, character);
        if count > UNESCAPED_TOLERANCE {
            issues.push(ValidationIssue::UnescapedCharacter { character, count });
        }
    }

    for (open, close) in LIST_PAIRS {
        let opens = count_command(body, open);
        let closes = count_command(body, close);
        if opens != closes {
            issues.push(ValidationIssue::UnbalancedList {
                open: open.to_string(),
                opens,
                closes,
            });
        }
    }

    issues
}

/// Occurrences of `target` not directly preceded by a backslash.
fn count_unescaped(text: &str, target: char) -> usize {
    let mut count = 0;
    let mut previous = None;
    for c in text.chars() {
        if c == target && previous != Some('\\') {
            count += 1;
        }
        previous = Some(c);
    }
    count
}

/// Occurrences of `command` as a whole command: `\resumeItemListStart` does not
/// count hits inside `\resumeItemListStartNoSpace`.
fn count_command(text: &str, command: &str) -> usize {
    text.match_indices(command)
        .filter(|(offset, _)| {
            let next = text[offset + command.len()..].chars().next();
            !command.ends_with(|c: char| c.is_ascii_alphabetic())
                || !next.is_some_and(|c| c.is_ascii_alphabetic())
        })
        .count()
}
