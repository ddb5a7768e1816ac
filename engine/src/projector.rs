//! Projects candidate strings into editor suggestion items.

use fimpad_protocol::CandidateSet;
use fimpad_protocol::SuggestionItem;

/// Max preview characters taken from a candidate's first line.
pub const PREVIEW_MAX_CHARS: usize = 60;

/// Convert candidates into suggestion-list items, in rank order.
///
/// The sort key is the zero-padded candidate index so the editor keeps the
/// backend's ranking; index 0 is marked pre-selected. Opening the suggestion
/// UI is the session's job (via `SuggestionsReady`) — there are deliberately
/// no automatic trigger characters, suggestions appear only on the explicit
/// trigger chord.
pub fn project(candidates: &CandidateSet) -> Vec<SuggestionItem> {
    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let clean = candidate.trim();
            let line_count = clean.lines().count().max(1);
            SuggestionItem {
                label: format!("{}. {}", index + 1, preview(clean.lines().next().unwrap_or(""))),
                detail: format!(
                    "({line_count} line{})",
                    if line_count == 1 { "" } else { "s" }
                ),
                insert_text: clean.to_string(),
                sort_text: format!("{index:03}"),
                preselect: index == 0,
            }
        })
        .collect()
}

fn preview(first_line: &str) -> String {
    let mut chars = first_line.chars();
    let truncated: String = chars.by_ref().take(PREVIEW_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}
