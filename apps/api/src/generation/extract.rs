//! Pulls LaTeX source out of free-form model output.
//!
//! Precedence: fenced block, then `\documentclass`, then `\begin{document}`, then the
//! trimmed text. Fences are checked first because the prose around a fenced block can
//! mention `\documentclass` before the real document starts.

use once_cell::sync::Lazy;
use regex::Regex;

/// ```` ```latex\n...``` ```` or ```` ```\n...``` ````; the tag is optional and any word.
static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```").expect("fence pattern is valid")
});

const DOCUMENT_START: &str = "\\documentclass";
const BODY_START: &str = "\\begin{document}";

pub fn extract_latex(text: &str) -> String {
    if let Some(interior) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        return interior.as_str().trim().to_string();
    }

    for marker in [DOCUMENT_START, BODY_START] {
        if let Some(start) = text.find(marker) {
            return text[start..].trim().to_string();
        }
    }

    text.trim().to_string()
}
