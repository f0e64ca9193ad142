//! LaTeX generation: builds prompts for the three generation flows and calls the model.
//!
//! Every flow returns raw model text. Callers run it through `extract_latex`, which is
//! the single place model formatting quirks get normalised.

use tracing::info;

use crate::generation::prompts::{
    EDIT_PROMPT_TEMPLATE, EDIT_SYSTEM, GENERATION_SYSTEM, MARKUP_PROMPT_TEMPLATE,
    NOTES_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::{RAW_LATEX_ONLY, TEMPLATE_INSTRUCTION};
use crate::llm_client::{LlmError, TextGenerator};

/// Drafts a CV from free-form notes, optionally shaped by a template.
pub async fn generate_latex(
    llm: &dyn TextGenerator,
    input_text: &str,
    template: Option<&str>,
) -> Result<String, LlmError> {
    let (system, user) = build_notes_prompt(input_text, template);
    info!(
        "Generating LaTeX from {} chars of notes (template: {})",
        input_text.len(),
        template.is_some()
    );
    llm.complete(&system, &user).await
}

/// Applies a natural-language edit to an existing document.
pub async fn edit_latex(
    llm: &dyn TextGenerator,
    current_latex: &str,
    instruction: &str,
) -> Result<String, LlmError> {
    let (system, user) = build_edit_prompt(current_latex, instruction);
    info!("Editing LaTeX document ({} chars)", current_latex.len());
    llm.complete(&system, &user).await
}

/// Drafts a CV from scraped profile markup.
pub async fn generate_from_markup(
    llm: &dyn TextGenerator,
    profile_html: &str,
    template: Option<&str>,
) -> Result<String, LlmError> {
    let (system, user) = build_markup_prompt(profile_html, template);
    info!(
        "Generating LaTeX from {} chars of profile markup",
        profile_html.len()
    );
    llm.complete(&system, &user).await
}

fn build_notes_prompt(input_text: &str, template: Option<&str>) -> (String, String) {
    let user = fill(NOTES_PROMPT_TEMPLATE, &[("input_text", input_text.trim())]);
    (system_prompt(GENERATION_SYSTEM), with_template(user, template))
}

fn build_edit_prompt(current_latex: &str, instruction: &str) -> (String, String) {
    let user = fill(
        EDIT_PROMPT_TEMPLATE,
        &[
            ("instruction", instruction.trim()),
            ("current_latex", current_latex),
        ],
    );
    (system_prompt(EDIT_SYSTEM), user)
}

fn build_markup_prompt(profile_html: &str, template: Option<&str>) -> (String, String) {
    let user = fill(MARKUP_PROMPT_TEMPLATE, &[("profile_html", profile_html)]);
    (system_prompt(GENERATION_SYSTEM), with_template(user, template))
}

fn system_prompt(base: &str) -> String {
    format!("{base} {RAW_LATEX_ONLY}")
}

fn with_template(mut user: String, template: Option<&str>) -> String {
    if let Some(template) = template.filter(|t| !t.trim().is_empty()) {
        user.push('\n');
        user.push_str(TEMPLATE_INSTRUCTION);
        user.push_str("\n\nTemplate:\n");
        user.push_str(template);
    }
    user
}

/// Single-pass `{key}` substitution. Values are never rescanned, so user text that
/// happens to contain a placeholder name is left alone.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
