//! Prompt text for the workflow stages
//!
//! Each stage owns one prompt constant. The stage appends its input data
//! after the constant; the prompts end with a lead-in for that reason.

mod risk_analysis;
mod summarizer;
mod validation;

pub use risk_analysis::RISK_ANALYSIS_PROMPT;
pub use summarizer::SUMMARIZER_PROMPT;
pub use validation::VALIDATION_PROMPT;
