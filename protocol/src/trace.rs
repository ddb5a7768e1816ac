use chrono::DateTime;
use chrono::Local;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// One session-trace record describing a completion attempt end to end.
///
/// Every request produces exactly one of these, success or failure; an
/// acceptance produces a fresh record carrying the accepted text and the
/// final FIM text. Trace records live only for the current session (they are
/// never persisted) and are held most-recent-first in a bounded ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugEntry {
    pub timestamp: DateTime<Local>,
    pub endpoint: String,
    pub prompt: String,
    pub candidates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub request_url: String,
    pub request_body: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_fim_text: Option<String>,
    #[serde(default)]
    pub saved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Local>>,
    #[serde(default)]
    pub rejected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Local>>,
}

impl DebugEntry {
    pub fn new(
        endpoint: impl Into<String>,
        prompt: impl Into<String>,
        request_url: impl Into<String>,
        request_body: Value,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            endpoint: endpoint.into(),
            prompt: prompt.into(),
            candidates: Vec::new(),
            error: None,
            request_url: request_url.into(),
            request_body,
            status_code: None,
            model_label: None,
            accepted_text: None,
            final_fim_text: None,
            saved: false,
            saved_at: None,
            rejected: false,
            rejected_at: None,
        }
    }

    /// Whether the entry records an acceptance that has not yet been resolved
    /// by the user (saved or rejected). Only such entries may be edited.
    pub fn is_pending_acceptance(&self) -> bool {
        self.accepted_text.is_some() && !self.saved && !self.rejected
    }

    pub fn mark_saved(&mut self, at: DateTime<Local>) {
        self.saved = true;
        self.saved_at = Some(at);
    }

    pub fn mark_rejected(&mut self, at: DateTime<Local>) {
        self.rejected = true;
        self.rejected_at = Some(at);
    }

    /// Clear saved/rejected state after the entry's content was edited.
    pub fn reset_resolution(&mut self) {
        self.saved = false;
        self.saved_at = None;
        self.rejected = false;
        self.rejected_at = None;
    }
}
