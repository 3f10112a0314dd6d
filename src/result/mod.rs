//! The accumulated, ordered, deduplicated set of actions a run produces,
//! plus the three-phase commit that turns it into mailbox effects.

pub mod actions;
pub mod commit;

use actions::ActionDef;

/// One accepted action, in the order it was first added.
pub struct ActionEntry {
    pub action: Box<dyn ActionDef>,
}

impl std::fmt::Debug for ActionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ActionEntry({:?})", self.action)
    }
}

/// Insertion-ordered, deduplicated list of actions collected during a run.
#[derive(Default)]
pub struct ResultSet {
    entries: Vec<ActionEntry>,
}

impl ResultSet {
    pub fn new() -> Self {
        ResultSet::default()
    }

    /// Adds `action` unless it duplicates one already present, in which
    /// case the earlier entry wins and `action` is dropped.
    pub fn add_action(&mut self, action: Box<dyn ActionDef>) {
        let is_dup = self.entries.iter().any(|e| e.action.is_duplicate_of(action.as_ref()));
        if is_dup {
            log::debug!("dropping duplicate action {}", action.name());
            return;
        }
        self.entries.push(ActionEntry { action });
    }

    pub fn entries(&self) -> &[ActionEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [ActionEntry] {
        &mut self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn any_saves_message(&self) -> bool {
        self.entries.iter().any(|e| e.action.saves_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actions::{DiscardAction, FileintoAction, KeepAction};

    #[test]
    fn duplicate_fileinto_is_dropped() {
        let mut results = ResultSet::new();
        results.add_action(Box::new(FileintoAction::new("Archive".into(), vec![])));
        results.add_action(Box::new(FileintoAction::new("Archive".into(), vec![])));
        assert_eq!(results.entries().len(), 1);
    }

    #[test]
    fn distinct_actions_both_kept_in_order() {
        let mut results = ResultSet::new();
        results.add_action(Box::new(KeepAction::new()));
        results.add_action(Box::new(DiscardAction));
        assert_eq!(results.entries().len(), 2);
        assert_eq!(results.entries()[0].action.name(), "keep");
        assert_eq!(results.entries()[1].action.name(), "discard");
    }
}
