// Extraction pipeline: section prompts, model-output parsing and the
// per-document orchestrator that merges everything into one record.

pub mod orchestrator;
pub mod parser;
pub mod prompter;
pub mod prompts;
pub mod record;

pub use orchestrator::DocumentExtractor;
pub use prompter::{CompetencyLevel, Section, SectionPrompter};
pub use record::{ExtractionOutcome, ParsedDocument};
