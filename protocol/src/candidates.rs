use serde::Deserialize;
use serde::Serialize;

/// Ordered candidate completions for one request.
///
/// Backend order is the ranking surfaced to the user; index 0 is the most
/// preferred candidate. Blank candidates are filtered out at construction, so
/// every entry has a non-empty trimmed form. The set itself may legitimately
/// be empty (no suggestions).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateSet(Vec<String>);

impl CandidateSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a set from raw backend strings, dropping entries whose trimmed
    /// form is empty while preserving relative order.
    pub fn from_raw<I>(raw: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self(
            raw.into_iter()
                .filter(|text| !text.trim().is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
