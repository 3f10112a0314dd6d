//! Drives the three-phase commit (`start`/`execute`/`commit`, `rollback`
//! on any later failure) over a [`ResultSet`] in insertion order, with
//! implicit keep as the fallback when nothing else saved the message.

use crate::collab::MailStoreAdapter;
use crate::error::{ExecStatus, SieveResult};

use super::actions::KeepAction;
use super::ResultSet;

/// Runs the commit protocol. `run_status` is the VM's own run outcome;
/// implicit keep only fires when the run failed and no action in
/// `results` already saved the message, matching the original's
/// `*keep = !status` plus "did anything save the message" bookkeeping.
pub fn run(
    results: &mut ResultSet,
    store: &mut dyn MailStoreAdapter,
    run_status: ExecStatus,
) -> SieveResult<()> {
    let saves_message = results.any_saves_message();
    let entries = results.entries_mut();

    let mut started = 0usize;
    let mut failed = false;

    for entry in entries.iter_mut() {
        if let Err(e) = entry.action.start(store) {
            log::warn!("action {} failed to start: {e}", entry.action.name());
            failed = true;
            break;
        }
        started += 1;
    }

    if !failed {
        for entry in entries.iter_mut().take(started) {
            if let Err(e) = entry.action.execute(store) {
                log::warn!("action {} failed to execute: {e}", entry.action.name());
                failed = true;
                break;
            }
        }
    }

    if !failed {
        for entry in entries.iter_mut().take(started) {
            if let Err(e) = entry.action.commit(store) {
                log::warn!("action {} failed to commit: {e}", entry.action.name());
                failed = true;
                break;
            }
        }
    }

    if failed {
        for entry in entries.iter_mut().take(started) {
            entry.action.rollback(store);
        }
    }

    let message_saved = !failed && saves_message;
    // Implicit keep fires for an actual FAILURE (top-level VM status, or a
    // commit-phase action that failed, which is itself a runtime failure)
    // but never for TEMP_FAILURE/BIN_CORRUPT, which are reported up as-is.
    if (failed || run_status == ExecStatus::Failure) && !message_saved {
        log::debug!("falling back to implicit keep");
        let mut keep = KeepAction::new();
        keep.start(store)?;
        keep.execute(store)?;
        keep.commit(store)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::actions::FileintoAction;

    #[derive(Default)]
    struct FakeStore {
        opened: Vec<String>,
        copied: Vec<String>,
    }

    impl MailStoreAdapter for FakeStore {
        fn is_redundant_store(&self, _mailbox: &str) -> bool {
            false
        }
        fn open_or_create(&mut self, mailbox: &str, _autocreate: bool) -> SieveResult<()> {
            self.opened.push(mailbox.to_string());
            Ok(())
        }
        fn copy_message(&mut self, mailbox: &str) -> SieveResult<()> {
            self.copied.push(mailbox.to_string());
            Ok(())
        }
        fn update_flags(&mut self, _mailbox: &str, _flags: &[String]) -> SieveResult<()> {
            Ok(())
        }
    }

    #[test]
    fn successful_run_does_not_trigger_implicit_keep() {
        let mut results = ResultSet::new();
        results.add_action(Box::new(FileintoAction::new("Archive".into(), vec![])));
        let mut store = FakeStore::default();
        run(&mut results, &mut store, ExecStatus::Ok).unwrap();
        assert_eq!(store.copied, vec!["Archive".to_string()]);
    }

    #[test]
    fn failed_run_with_no_saving_action_falls_back_to_keep() {
        let mut results = ResultSet::new();
        let mut store = FakeStore::default();
        run(&mut results, &mut store, ExecStatus::Failure).unwrap();
        assert_eq!(store.copied, vec!["INBOX".to_string()]);
    }

    #[test]
    fn temp_failure_does_not_trigger_implicit_keep() {
        let mut results = ResultSet::new();
        let mut store = FakeStore::default();
        run(&mut results, &mut store, ExecStatus::TempFailure).unwrap();
        assert!(store.copied.is_empty());
    }
}
