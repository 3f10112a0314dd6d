//! Collaborator trait boundaries. The grammar/parser/AST/validator, the
//! mail store itself, and any external-process notification method live
//! outside this crate; these traits are the seams the core calls through.

use crate::binary::writer::BinaryWriter;
use crate::error::SieveResult;
use crate::result::ActionEntry;

/// Supplies the compiled bytecode a [`crate::engine::Engine`] loads or
/// executes. The lexer/parser/AST/validator that produce this input are
/// out of scope for this crate.
pub trait ScriptSource {
    fn read(&mut self, buf: &mut Vec<u8>) -> SieveResult<()>;
}

/// The seam `Engine::compile` emits bytecode through. The lexer, parser,
/// AST and validator that turn script source into a sequence of
/// `BinaryWriter` calls are out of scope for this crate (spec §1
/// Non-goals); a generator is anything that can walk its own validated
/// AST and lower it into the writer the way the original's code
/// generator walks `sieve_ast` nodes.
pub trait Generator {
    fn generate(&mut self, writer: &mut BinaryWriter) -> SieveResult<()>;
}

/// The mailbox backend an action's three-phase commit talks to.
pub trait MailStoreAdapter {
    /// Returns `true` if `mailbox` and the message's origin mailbox are the
    /// same backend object, triggering the redundant-store shortcut.
    fn is_redundant_store(&self, mailbox: &str) -> bool;
    fn open_or_create(&mut self, mailbox: &str, autocreate: bool) -> SieveResult<()>;
    fn copy_message(&mut self, mailbox: &str) -> SieveResult<()>;
    fn update_flags(&mut self, mailbox: &str, flags: &[String]) -> SieveResult<()>;
}

/// Optional collaborator consulted by duplicate-suppression actions.
/// A core without this extension simply has no actions that call it.
pub trait DuplicateTracker {
    fn available(&self) -> bool;
    fn check(&mut self, id: &str) -> SieveResult<bool>;
    fn mark(&mut self, id: &str) -> SieveResult<()>;
}

/// Receives compile/runtime diagnostics in addition to the `log` crate
/// output the core always emits.
pub trait ErrorSink {
    fn error(&mut self, message: &str) {
        log::error!("{message}");
    }
    fn warning(&mut self, message: &str) {
        log::warn!("{message}");
    }
}

/// Receives a line of interpreter execution trace, mirroring the
/// original's separate `sieve_runtime_trace` facility.
pub trait TraceSink {
    fn trace(&mut self, line: &str) {
        log::trace!("{line}");
    }
}

/// The message a program is testing against. Header/address extraction
/// for `header`/`address` tests and the `size` test go through here; the
/// message store itself is out of scope for this crate.
pub trait MessageView {
    /// Returns the raw values of every header with the given name, in
    /// message order. Header name matching is case-insensitive.
    fn header(&self, name: &str) -> Vec<Vec<u8>>;
    fn size(&self) -> u64;
}

/// Invokes an external program for the `vnd.dovecot.execute` style
/// extension point. No extension in this core registers one by default;
/// this trait only describes the seam spec'd for the collaborator.
pub trait ProgramClient {
    fn connect_timeout_secs(&self) -> u32;
    fn idle_timeout_secs(&self) -> u32;
    fn run(&mut self, binary: &str, args: &[String], input: &[u8]) -> SieveResult<Vec<u8>>;
}

/// A no-op sink pair used when the caller doesn't care to observe
/// diagnostics or trace output.
#[derive(Default)]
pub struct NullSink;

impl ErrorSink for NullSink {}
impl TraceSink for NullSink {}

/// Receives the final, committed result set for inspection (used by
/// `Engine::test`, which dumps the plan instead of running the commit
/// phase against a real mail store).
pub trait ResultObserver {
    fn observe(&mut self, actions: &[ActionEntry]);
}
