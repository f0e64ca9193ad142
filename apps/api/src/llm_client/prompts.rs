// Shared prompt constants. Each service that needs LLM calls defines its own
// prompts.rs alongside it; this file holds the cross-cutting fragments.

/// Output constraint shared by every LaTeX-producing call.
pub const RAW_LATEX_ONLY: &str = "\
    You only output raw LaTeX with no Markdown code fences or commentary.";

/// Instruction used whenever a template accompanies the request.
pub const TEMPLATE_INSTRUCTION: &str = "\
    Use the following LaTeX template as the base. Keep its structure, commands, and styling, \
    and fill in content based on the material above. If fields are missing, omit them cleanly.";
