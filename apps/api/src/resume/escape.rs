//! LaTeX escaping for every piece of user- or LLM-supplied text.
//!
//! Not idempotent: escaping twice double-escapes. Escape raw source text exactly once.

use std::sync::OnceLock;

use regex::Regex;

/// Characters that must never reach the document unescaped.
pub const SPECIAL_CHARS: [char; 12] = ['\\', '&', '%', '$', '#', '_', '{', '}', '~', '^', '<', '>'];

fn replacement(c: char) -> Option<&'static str> {
    Some(match c {
        '\\' => r"\textbackslash{}",
        '&' => r"\&",
        '%' => r"\%",
        '$' => r"\$",
        '#' => r"\#",
        '_' => r"\_",
        '{' => r"\{",
        '}' => r"\}",
        '~' => r"\textasciitilde{}",
        '^' => r"\textasciicircum{}",
        '<' => r"\textless{}",
        '>' => r"\textgreater{}",
        _ => return None,
    })
}

/// Escapes `text` for insertion into a LaTeX document.
///
/// `None`, empty and whitespace-only input yield `""`. LaTeX commands the model
/// may have copied from the prompt are neutralised first (`\item` becomes `-`,
/// emphasis commands are dropped); character escaping runs last, one character
/// at a time, so no replacement is ever re-escaped.
pub fn escape_latex(text: Option<&str>) -> String {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return String::new();
    };

    let text = strip_llm_commands(text);
    if !text.contains(&SPECIAL_CHARS[..]) {
        return text;
    }

    let mut escaped = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        match replacement(c) {
            Some(r) => escaped.push_str(r),
            None => escaped.push(c),
        }
    }
    escaped
}

fn strip_llm_commands(text: &str) -> String {
    static ITEM_RE: OnceLock<Regex> = OnceLock::new();
    static EMPHASIS_RE: OnceLock<Regex> = OnceLock::new();

    let item_re = ITEM_RE.get_or_init(|| Regex::new(r"\\item\b").unwrap());
    let emphasis_re =
        EMPHASIS_RE.get_or_init(|| Regex::new(r"\\(?:textbf|textit|emph|texttt)\b").unwrap());

    let text = item_re.replace_all(text, "-");
    emphasis_re.replace_all(&text, "").into_owned()
}
