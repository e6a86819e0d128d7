//! Translation work items and their per-request outcomes.

use std::collections::BTreeMap;

/// Caller-supplied identifier; the output key for an item.
pub type CallerId = i64;

/// One unit of translation work. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationItem {
    source_text: String,
    caller_id: CallerId,
    source_locale: String,
    target_locale: String,
}

impl TranslationItem {
    pub fn new(
        source_text: impl Into<String>,
        caller_id: CallerId,
        source_locale: impl Into<String>,
        target_locale: impl Into<String>,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            caller_id,
            source_locale: source_locale.into(),
            target_locale: target_locale.into(),
        }
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn caller_id(&self) -> CallerId {
        self.caller_id
    }

    pub fn source_locale(&self) -> &str {
        &self.source_locale
    }

    pub fn target_locale(&self) -> &str {
        &self.target_locale
    }
}

/// Resolution of a single item: a translation or the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Translated(String),
    Failed(String),
}

impl ItemOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ItemOutcome::Failed(_))
    }

    /// Legacy string rendering: failures become a placeholder embedding the reason.
    pub fn render(&self) -> String {
        match self {
            ItemOutcome::Translated(text) => text.clone(),
            ItemOutcome::Failed(reason) => placeholder(reason),
        }
    }
}

pub fn placeholder(reason: &str) -> String {
    format!("[Translation error: {reason}]")
}

/// Merged result of one batch request, keyed by caller id.
///
/// Duplicate caller ids resolve last-write-wins in the map while both counters
/// keep counting items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationResult {
    outcomes: BTreeMap<CallerId, ItemOutcome>,
    cached_count: usize,
    translated_count: usize,
    incomplete: bool,
}

impl TranslationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cached(&mut self, caller_id: CallerId, translation: String) {
        self.outcomes
            .insert(caller_id, ItemOutcome::Translated(translation));
        self.cached_count += 1;
    }

    /// Record a backend result; placeholders count as translated.
    pub fn record_translated(&mut self, caller_id: CallerId, outcome: ItemOutcome) {
        self.outcomes.insert(caller_id, outcome);
        self.translated_count += 1;
    }

    pub fn mark_incomplete(&mut self) {
        self.incomplete = true;
    }

    pub fn outcomes(&self) -> &BTreeMap<CallerId, ItemOutcome> {
        &self.outcomes
    }

    pub fn outcome(&self, caller_id: CallerId) -> Option<&ItemOutcome> {
        self.outcomes.get(&caller_id)
    }

    pub fn cached_count(&self) -> usize {
        self.cached_count
    }

    pub fn translated_count(&self) -> usize {
        self.translated_count
    }

    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    /// Legacy view: every outcome rendered to a string.
    pub fn rendered(&self) -> BTreeMap<CallerId, String> {
        self.outcomes
            .iter()
            .map(|(id, outcome)| (*id, outcome.render()))
            .collect()
    }

    pub fn failures(&self) -> BTreeMap<CallerId, String> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| match outcome {
                ItemOutcome::Failed(reason) => Some((*id, reason.clone())),
                ItemOutcome::Translated(_) => None,
            })
            .collect()
    }
}
