//! Conversational agent for catalog search.
//!
//! The text-generation backend is strictly a translator: it turns free
//! text into a sparse preference map and phrases clarifying questions.
//! It never decides which cars match - that is the deterministic filter
//! normalizer and the catalog store. Every model-backed step degrades to
//! a rule-based fallback, so the conversation keeps working when the
//! backend is down.
//!
//! - [`generation`] - the pluggable capability interface
//! - [`ollama`] / [`deterministic`] - the two implementing variants
//! - [`factory`] - provider selection with automatic fallback
//! - [`extract`] - free text to [`showroom_core::PreferenceMap`]
//! - [`conversation`] - the per-connection turn state machine

pub mod conversation;
pub mod deterministic;
pub mod extract;
pub mod factory;
pub mod format;
pub mod generation;
pub mod ollama;
pub mod prompts;

pub use conversation::{CarSearcher, ConversationEngine, ConversationSession, ConversationState};
pub use extract::PreferenceExtractor;
pub use generation::{GenerationError, GenerationRequest, TaskKind, TextGenerator};
