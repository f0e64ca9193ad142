// All LLM prompt constants for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for drafting a CV from notes or profile markup.
pub const GENERATION_SYSTEM: &str =
    "You are an expert LaTeX assistant that writes production-ready, compilable LaTeX.";

/// System prompt for edits. Keeps the document recognisable unless told otherwise.
pub const EDIT_SYSTEM: &str = "You are an expert LaTeX assistant. \
    You return complete, compilable LaTeX only. \
    Preserve the document class, preamble, and overall structure \
    unless the instruction explicitly requests otherwise.";

/// Notes prompt. Replace `{input_text}` before sending.
pub const NOTES_PROMPT_TEMPLATE: &str = "\
Create a high-quality LaTeX CV from the following notes. \
Return complete LaTeX that compiles standalone with article/report or a typical CV class. \
Do not include Markdown code fences.

Notes:
{input_text}
";

/// Edit prompt. Replace `{instruction}` and `{current_latex}` before sending.
pub const EDIT_PROMPT_TEMPLATE: &str = "\
You are given an existing LaTeX document and an edit request. \
Apply the requested change to the LaTeX. Return the FULL updated LaTeX document.

Instruction:
{instruction}

Current LaTeX:
{current_latex}";

/// Profile markup prompt. Replace `{profile_html}` before sending.
pub const MARKUP_PROMPT_TEMPLATE: &str = "\
The following is the raw HTML of a public professional profile page. \
It contains navigation, scripts, tracking markup and other noise. \
Extract only the person's data: full name, headline, location, contact links, \
work experience (role, company, dates, highlights), education, skills, languages, \
projects and certifications. Ignore anything that is not about the person. \
Do not invent details that are not present in the page.

Then create a high-quality LaTeX CV from the extracted data. \
Return complete LaTeX that compiles standalone with article/report or a typical CV class. \
Do not include Markdown code fences.

Profile HTML:
{profile_html}
";
