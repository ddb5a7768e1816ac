mod candidates;
pub use candidates::CandidateSet;
pub mod errors;
pub use errors::CompletionError;
pub use errors::LogError;
pub mod fim;
pub use fim::CompletionRequest;
pub use fim::FimPrompt;
mod log_entry;
pub use log_entry::LogEntry;
pub mod models;
pub use models::ModelConfig;
pub mod session;
pub use session::EditorOp;
pub use session::SessionEvent;
pub use session::SuggestionItem;
mod trace;
pub use trace::DebugEntry;
