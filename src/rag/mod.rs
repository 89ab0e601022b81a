//! Retrieval-augmented question answering over uploaded documents.
//!
//! A question is routed to one of two paths:
//!
//! - **Summary**: "what is this about" style questions summarize the latest document (or broad
//!   index passages) after normalization, masking, and type-aware prompting.
//! - **QA**: everything else retrieves passages, builds a bounded context, and asks the QA model
//!   to answer strictly from it.
//!
//! Both paths always yield an [`Answer`]; model and index failures degrade to canned or
//! extractive answers.

pub mod classify;
pub mod mask;
pub mod normalize;
pub mod prompt;
pub mod retrieval;
pub mod router;
pub mod service;
pub mod synthesize;
pub mod types;

pub use classify::{DocumentType, classify};
pub use mask::mask;
pub use normalize::{clean_text_light, extract_meaningful_content, normalize};
pub use prompt::{build_qa_prompt, build_summary_prompt};
pub use retrieval::{Retriever, SummaryInput, build_context};
pub use router::{Mode, route};
pub use service::{QaApi, QaService};
pub use synthesize::{AnswerSynthesizer, ModelRole};
pub use types::{Answer, AnswerOutcome, Context, RagSettings, SynthesisError};
