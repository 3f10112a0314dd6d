//! Bytecode compiler artifact, VM, match engine and result pipeline for a
//! mail-filtering script language.
//!
//! The grammar, parser, AST and validator that produce the bytecode this
//! crate loads are out of scope here; see [`collab::ScriptSource`] for the
//! seam a generator plugs into.

pub mod binary;
pub mod collab;
pub mod engine;
pub mod error;
pub mod interp;
pub mod match_engine;
pub mod result;
pub mod schema;

pub use binary::Binary;
pub use engine::Engine;
pub use error::{ExecStatus, SieveError, SieveResult};
