//! Per-editor session coordinator.
//!
//! One [`EditorSession`] exists per editor instance and owns everything the
//! completion lifecycle needs: the pending-offer state machine, the trace
//! ring, the completion log, and a generation counter. It runs as a single
//! logical thread: `EditorOp`s from the host editor and internal ops
//! (completion results, timer echoes) arrive over one mpsc channel and are
//! handled one at a time in [`EditorSession::handle_op`]; `SessionEvent`s go
//! back out over another. The network call is the only suspending
//! operation — it runs in a spawned task and re-enters the loop as a
//! generation-stamped [`SessionOp::CompletionResult`], so a superseded
//! request's late response is recognized and dropped.

use std::time::Duration;

use chrono::Local;
use chrono::Utc;
use fimpad_protocol::CandidateSet;
use fimpad_protocol::CompletionError;
use fimpad_protocol::CompletionRequest;
use fimpad_protocol::DebugEntry;
use fimpad_protocol::EditorOp;
use fimpad_protocol::FimPrompt;
use fimpad_protocol::LogEntry;
use fimpad_protocol::ModelConfig;
use fimpad_protocol::SessionEvent;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;

use crate::client::CompletionClient;
use crate::completion_log::CompletionLog;
use crate::config::AppConfig;
use crate::detector::AcceptanceDetector;
use crate::detector::DWELL_TIMEOUT;
use crate::detector::HIGHLIGHT_CLEAR_AFTER;
use crate::projector;
use crate::trace_ring::EditOutcome;
use crate::trace_ring::TraceRing;

/// Everything the session loop reacts to: editor submissions plus internal
/// re-entries from spawned tasks.
#[derive(Debug)]
pub enum SessionOp {
    Editor(EditorOp),
    /// A completion attempt finished. Stamped with the generation of the
    /// trigger that started it; stale results only land in the trace.
    CompletionResult {
        generation: u64,
        prompt: FimPrompt,
        cursor_offset: usize,
        result: Result<CandidateSet, CompletionError>,
        debug: DebugEntry,
    },
    /// Dwell timer echo for the offer created at `generation`.
    DwellExpired { generation: u64 },
    /// Highlight timer echo.
    HighlightElapsed,
}

pub struct EditorSession {
    model: ModelConfig,
    client: CompletionClient,
    detector: AcceptanceDetector,
    trace: TraceRing,
    log: CompletionLog,
    /// Bumped on every trigger; identifies the one live request/offer.
    generation: u64,
    ops: UnboundedSender<SessionOp>,
    events: UnboundedSender<SessionEvent>,
}

impl EditorSession {
    /// Build a session from config. Returns the session plus the receiving
    /// half of its op channel; the sending half is available via
    /// [`EditorSession::op_sender`].
    pub fn new(
        config: &AppConfig,
        events: UnboundedSender<SessionEvent>,
    ) -> anyhow::Result<(Self, UnboundedReceiver<SessionOp>)> {
        let model = config.active_model()?.clone();
        let client = CompletionClient::new(Duration::from_millis(config.request_timeout_ms))?;
        let log = CompletionLog::open(
            config.data_dir()?,
            config.key_prefix.clone(),
            config.file_prefix.clone(),
        );
        let (ops_tx, ops_rx) = unbounded_channel();
        Ok((
            Self {
                model,
                client,
                detector: AcceptanceDetector::new(),
                trace: TraceRing::new(config.max_debug_entries),
                log,
                generation: 0,
                ops: ops_tx,
                events,
            },
            ops_rx,
        ))
    }

    pub fn op_sender(&self) -> UnboundedSender<SessionOp> {
        self.ops.clone()
    }

    pub fn trace(&self) -> &TraceRing {
        &self.trace
    }

    pub fn detector(&self) -> &AcceptanceDetector {
        &self.detector
    }

    /// Drive the session until all op senders are dropped.
    pub async fn run(mut self, mut ops: UnboundedReceiver<SessionOp>) {
        while let Some(op) = ops.recv().await {
            self.handle_op(op);
        }
    }

    /// Handle one op. All session state mutation happens here, synchronously.
    pub fn handle_op(&mut self, op: SessionOp) {
        match op {
            SessionOp::Editor(op) => self.handle_editor_op(op),
            SessionOp::CompletionResult {
                generation,
                prompt,
                cursor_offset,
                result,
                debug,
            } => self.handle_completion_result(generation, prompt, cursor_offset, result, debug),
            SessionOp::DwellExpired { generation } => {
                if self.detector.on_dwell_expired(generation) {
                    tracing::debug!(generation, "offer expired unacted-upon");
                }
            }
            SessionOp::HighlightElapsed => self.emit(SessionEvent::ClearHighlight),
        }
    }

    fn handle_editor_op(&mut self, op: EditorOp) {
        match op {
            EditorOp::TriggerCompletion {
                full_text,
                cursor_offset,
            } => self.handle_trigger(full_text, cursor_offset),
            EditorOp::BufferMutated {
                inserted_text,
                insert_offset,
            } => self.handle_buffer_mutated(&inserted_text, insert_offset),
            EditorOp::Escape => self.emit(SessionEvent::ClearHighlight),
            EditorOp::SaveEntry { index } => self.handle_save_entry(index),
            EditorOp::RejectEntry { index } => {
                if self.trace.mark_rejected(index) {
                    self.emit(SessionEvent::TraceUpdated);
                } else {
                    self.notice(format!("Trace entry {index} cannot be rejected"));
                }
            }
            EditorOp::EditEntry { index, content } => {
                match self.trace.edit_entry(index, &content) {
                    EditOutcome::Applied => self.emit(SessionEvent::TraceUpdated),
                    EditOutcome::Refused => {
                        self.notice(format!("Trace entry {index} cannot be edited"));
                    }
                    EditOutcome::NoSuchEntry => {
                        self.notice(format!("No trace entry at index {index}"));
                    }
                }
            }
            EditorOp::ExportAll => self.handle_export_all(),
            EditorOp::ClearDay { date } => match self.log.clear(date) {
                Ok(()) => {
                    self.notice(format!(
                        "Cleared completion partition {}",
                        self.log.partition_key(date)
                    ));
                }
                Err(err) => {
                    tracing::error!(%err, "clear failed");
                    self.notice(err.to_string());
                }
            },
        }
    }

    /// Trigger chord: capture text and cursor now, bump the generation
    /// (superseding any outstanding request or offer), and fire the request
    /// in the background.
    fn handle_trigger(&mut self, full_text: String, cursor_offset: usize) {
        self.generation += 1;
        let generation = self.generation;

        let request = CompletionRequest::new(full_text, cursor_offset);
        let cursor_offset = request.cursor_offset();
        let prompt = request.frame();
        self.detector.on_trigger(generation);

        let client = self.client.clone();
        let model = self.model.clone();
        let ops = self.ops.clone();
        tokio::spawn(async move {
            let (result, debug) = client.request(&prompt, &model).await;
            // The session may be gone by the time the response lands.
            let _ = ops.send(SessionOp::CompletionResult {
                generation,
                prompt,
                cursor_offset,
                result,
                debug,
            });
        });
    }

    fn handle_completion_result(
        &mut self,
        generation: u64,
        prompt: FimPrompt,
        cursor_offset: usize,
        result: Result<CandidateSet, CompletionError>,
        debug: DebugEntry,
    ) {
        // Every attempt lands in the trace, stale or not.
        self.trace.record(debug);
        self.emit(SessionEvent::TraceUpdated);

        if generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                "dropping stale completion response"
            );
            return;
        }

        match result {
            Err(err) => {
                // Failure means "no offer": nothing is shown, the trace holds
                // the details.
                tracing::warn!(%err, "completion request failed");
                self.detector.reset();
            }
            Ok(candidates) => {
                if self
                    .detector
                    .on_response(generation, prompt, candidates.clone(), cursor_offset)
                {
                    let items = projector::project(&candidates);
                    self.emit(SessionEvent::SuggestionsReady { generation, items });

                    let ops = self.ops.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(DWELL_TIMEOUT).await;
                        let _ = ops.send(SessionOp::DwellExpired { generation });
                    });
                }
            }
        }
    }

    fn handle_buffer_mutated(&mut self, inserted_text: &str, insert_offset: usize) {
        let Some(acceptance) = self.detector.on_buffer_mutated(inserted_text) else {
            return;
        };

        let mut entry = DebugEntry::new(
            self.model.endpoint.clone(),
            acceptance.original_prompt.as_str(),
            String::new(),
            serde_json::Value::Null,
        );
        entry.candidates = vec![acceptance.accepted_text.clone()];
        entry.status_code = Some(200);
        entry.model_label = Some(format!("{} (accepted)", self.model.name));
        entry.accepted_text = Some(acceptance.accepted_text.clone());
        entry.final_fim_text = Some(acceptance.final_fim_text.clone());
        self.trace.record(entry);
        self.emit(SessionEvent::TraceUpdated);

        self.emit(SessionEvent::CompletionAccepted {
            accepted_text: acceptance.accepted_text,
            original_prompt: acceptance.original_prompt.as_str().to_string(),
            final_fim_text: acceptance.final_fim_text,
        });
        self.emit(SessionEvent::HighlightSpan {
            offset: insert_offset,
            len: inserted_text.len(),
            clear_after_secs: HIGHLIGHT_CLEAR_AFTER.as_secs(),
        });

        let ops = self.ops.clone();
        tokio::spawn(async move {
            tokio::time::sleep(HIGHLIGHT_CLEAR_AFTER).await;
            let _ = ops.send(SessionOp::HighlightElapsed);
        });
    }

    fn handle_save_entry(&mut self, index: usize) {
        let Some(final_fim_text) = self
            .trace
            .get(index)
            .filter(|entry| entry.is_pending_acceptance())
            .and_then(|entry| entry.final_fim_text.clone())
        else {
            self.notice(format!("Trace entry {index} has nothing to save"));
            return;
        };

        let log_entry = LogEntry {
            content: final_fim_text,
            timestamp: Utc::now(),
            model: self.model.name.clone(),
        };
        match self.log.append(log_entry) {
            Ok(()) => {
                self.trace.mark_saved(index);
                self.emit(SessionEvent::TraceUpdated);
                self.notice(format!(
                    "Saved completion to {} ({} total entries)",
                    self.log.partition_key(Local::now().date_naive()),
                    self.log.mirror().len(),
                ));
            }
            Err(err) => {
                // Surface the key and attempted entry count; the session
                // keeps running.
                tracing::error!(%err, "persisting completion failed");
                self.notice(err.to_string());
            }
        }
    }

    fn handle_export_all(&mut self) {
        match self.log.export_all() {
            Ok(Some(blob)) => self.emit(SessionEvent::ExportReady {
                file_name: blob.file_name,
                jsonl: blob.jsonl,
            }),
            Ok(None) => self.notice("No completions saved yet".to_string()),
            Err(err) => {
                tracing::error!(%err, "export failed");
                self.notice(format!("Export failed: {err}"));
            }
        }
    }

    fn notice(&self, text: String) {
        self.emit(SessionEvent::Notice { text });
    }

    fn emit(&self, event: SessionEvent) {
        // The editor side may have hung up; the session itself keeps going.
        let _ = self.events.send(event);
    }
}

/// Spawn a session event loop for the given config. Returns the op sender
/// the host editor submits through and the event stream it must apply.
pub fn spawn_session(
    config: &AppConfig,
) -> anyhow::Result<(UnboundedSender<SessionOp>, UnboundedReceiver<SessionEvent>)> {
    let (events_tx, events_rx) = unbounded_channel();
    let (session, ops_rx) = EditorSession::new(config, events_tx)?;
    let ops_tx = session.op_sender();
    tokio::spawn(session.run(ops_rx));
    Ok((ops_tx, events_rx))
}
