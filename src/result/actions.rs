use std::any::Any;

use crate::collab::MailStoreAdapter;
use crate::error::SieveResult;

/// One mail action's three-phase lifecycle. `start` may detect that this
/// action is redundant (e.g. a `fileinto` into the message's own origin
/// mailbox) and downgrade `execute` to a flag/keyword-only update, as
/// `act_store_start`/`act_store_execute` do.
pub trait ActionDef: std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Whether `self` and `other` are the same effective action and so
    /// `self` should be dropped in favor of the earlier one already in
    /// the result set (mirrors `act_store_equals`'s case-insensitive
    /// `INBOX` special case).
    fn is_duplicate_of(&self, other: &dyn ActionDef) -> bool;

    fn start(&mut self, _store: &dyn MailStoreAdapter) -> SieveResult<()> {
        Ok(())
    }

    fn execute(&mut self, store: &mut dyn MailStoreAdapter) -> SieveResult<()>;

    fn commit(&mut self, _store: &mut dyn MailStoreAdapter) -> SieveResult<()> {
        Ok(())
    }

    fn rollback(&mut self, _store: &mut dyn MailStoreAdapter) {}

    /// Whether committing this action counts as having saved the message
    /// (suppresses implicit keep).
    fn saves_message(&self) -> bool {
        false
    }

    /// Narrows to a concrete action kind for `is_duplicate_of` comparisons.
    fn as_any(&self) -> &dyn Any;
}

fn mailbox_eq(a: &str, b: &str) -> bool {
    a == b || (a.eq_ignore_ascii_case("INBOX") && b.eq_ignore_ascii_case("INBOX"))
}

#[derive(Debug, Clone)]
pub struct KeepAction {
    redundant: bool,
}

impl KeepAction {
    pub fn new() -> Self {
        KeepAction { redundant: false }
    }
}

impl Default for KeepAction {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionDef for KeepAction {
    fn name(&self) -> &'static str {
        "keep"
    }

    fn is_duplicate_of(&self, other: &dyn ActionDef) -> bool {
        other.name() == "keep"
    }

    fn start(&mut self, store: &dyn MailStoreAdapter) -> SieveResult<()> {
        self.redundant = store.is_redundant_store("INBOX");
        Ok(())
    }

    fn execute(&mut self, store: &mut dyn MailStoreAdapter) -> SieveResult<()> {
        if self.redundant {
            return Ok(());
        }
        store.open_or_create("INBOX", false)?;
        store.copy_message("INBOX")
    }

    fn saves_message(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
pub struct FileintoAction {
    pub mailbox: String,
    pub flags: Vec<String>,
    redundant: bool,
}

impl FileintoAction {
    pub fn new(mailbox: String, flags: Vec<String>) -> Self {
        FileintoAction { mailbox, flags, redundant: false }
    }
}

impl ActionDef for FileintoAction {
    fn name(&self) -> &'static str {
        "fileinto"
    }

    fn is_duplicate_of(&self, other: &dyn ActionDef) -> bool {
        match other.as_any().downcast_ref::<FileintoAction>() {
            Some(f) => mailbox_eq(&f.mailbox, &self.mailbox),
            None => false,
        }
    }

    fn start(&mut self, store: &dyn MailStoreAdapter) -> SieveResult<()> {
        self.redundant = store.is_redundant_store(&self.mailbox);
        Ok(())
    }

    fn execute(&mut self, store: &mut dyn MailStoreAdapter) -> SieveResult<()> {
        if self.redundant {
            return store.update_flags(&self.mailbox, &self.flags);
        }
        store.open_or_create(&self.mailbox, true)?;
        store.copy_message(&self.mailbox)?;
        if !self.flags.is_empty() {
            store.update_flags(&self.mailbox, &self.flags)?;
        }
        Ok(())
    }

    fn saves_message(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
pub struct RedirectAction {
    pub address: String,
}

impl ActionDef for RedirectAction {
    fn name(&self) -> &'static str {
        "redirect"
    }

    fn is_duplicate_of(&self, other: &dyn ActionDef) -> bool {
        match other.as_any().downcast_ref::<RedirectAction>() {
            Some(r) => r.address == self.address,
            None => false,
        }
    }

    fn execute(&mut self, _store: &mut dyn MailStoreAdapter) -> SieveResult<()> {
        log::info!("redirecting message to {}", self.address);
        Ok(())
    }

    fn saves_message(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscardAction;

impl ActionDef for DiscardAction {
    fn name(&self) -> &'static str {
        "discard"
    }

    fn is_duplicate_of(&self, other: &dyn ActionDef) -> bool {
        other.name() == "discard"
    }

    fn execute(&mut self, _store: &mut dyn MailStoreAdapter) -> SieveResult<()> {
        Ok(())
    }

    fn saves_message(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fileinto_inbox_variants_are_duplicates() {
        let a: Box<dyn ActionDef> = Box::new(FileintoAction::new("INBOX".into(), vec![]));
        let b: Box<dyn ActionDef> = Box::new(FileintoAction::new("inbox".into(), vec![]));
        assert!(a.is_duplicate_of(b.as_ref()));
    }

    #[test]
    fn fileinto_different_mailboxes_are_not_duplicates() {
        let a: Box<dyn ActionDef> = Box::new(FileintoAction::new("Archive".into(), vec![]));
        let b: Box<dyn ActionDef> = Box::new(FileintoAction::new("Trash".into(), vec![]));
        assert!(!a.is_duplicate_of(b.as_ref()));
    }

    #[test]
    fn different_action_kinds_are_never_duplicates() {
        let keep: Box<dyn ActionDef> = Box::new(KeepAction::new());
        let discard: Box<dyn ActionDef> = Box::new(DiscardAction);
        assert!(!keep.is_duplicate_of(discard.as_ref()));
    }
}
