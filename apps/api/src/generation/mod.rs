// LaTeX generation: prompt assembly, model calls, and output normalisation.
// All LLM calls go through llm_client; no direct HTTP calls here.

pub mod extract;
pub mod generator;
pub mod handlers;
pub mod prompts;

pub use extract::extract_latex;
