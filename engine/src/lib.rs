//! Completion lifecycle coordinator.
//!
//! Plumbs a host editor's trigger keystrokes through FIM prompt framing, an
//! OpenAI-completions-compatible backend, the editor's suggestion UI,
//! heuristic acceptance detection, and a day-partitioned durable completion
//! log. The editor widget itself is an external collaborator reduced to the
//! op/event channel defined in `fimpad-protocol`.

mod atomic_write;
pub mod client;
pub mod completion_log;
pub mod config;
pub mod detector;
pub mod projector;
pub mod session;
pub mod trace_ring;

pub use client::CompletionClient;
pub use completion_log::CompletionLog;
pub use config::AppConfig;
pub use config::ConfigStore;
pub use detector::AcceptanceDetector;
pub use session::EditorSession;
pub use session::SessionOp;
pub use session::spawn_session;
pub use trace_ring::TraceRing;
