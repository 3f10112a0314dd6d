use std::fmt;
use std::io;

/// Unrecoverable errors: container corruption, I/O failure, or a
/// compile-time configuration the core cannot honor. Distinct from
/// [`ExecStatus`], which is the VM's own four/five-way run outcome.
#[derive(Debug)]
pub enum SieveError {
    Io(io::Error),
    /// The container's magic number did not match in either byte order.
    BadMagic,
    /// The magic number matched byte-swapped: the container was written on
    /// a host with the opposite endianness and cannot be parsed here.
    IncompatibleEndian,
    /// Major or minor version did not match what this crate writes.
    VersionMismatch { found: (u8, u8), expected: (u8, u8) },
    /// A cursor ran past the end of its block.
    UnexpectedEof,
    /// A length-prefixed string was missing its trailing NUL sentinel.
    MissingStringSentinel,
    /// A varint decoded to a value wider than 64 bits.
    IntegerOverflow,
    /// A jump or loop-end offset fell outside `[1, block_size)`.
    OffsetOutOfRange { offset: i64, block_size: usize },
    /// An opcode or extension sub-code had no registered handler.
    UnknownOpCode(u64),
    /// The extension table referenced an index with no binary-local entry.
    UnknownExtension(u32),
    /// A comparator or match type combination that must fail closed rather
    /// than silently fall back to a default.
    UnsupportedComparator { match_type: &'static str, comparator: String },
    /// Loop nesting exceeded [`crate::engine::EngineLimits::max_loop_depth`].
    LoopDepthExceeded,
    /// A `LoopNext`/`LoopBreak` referenced a loop that isn't the current top.
    LoopStackMismatch,
}

impl fmt::Display for SieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SieveError::Io(e) => write!(f, "i/o error: {e}"),
            SieveError::BadMagic => write!(f, "bad container magic"),
            SieveError::IncompatibleEndian => {
                write!(f, "container was written with the opposite byte order")
            }
            SieveError::VersionMismatch { found, expected } => write!(
                f,
                "version mismatch: found {}.{}, expected {}.{}",
                found.0, found.1, expected.0, expected.1
            ),
            SieveError::UnexpectedEof => write!(f, "unexpected end of block"),
            SieveError::MissingStringSentinel => {
                write!(f, "string missing trailing NUL sentinel")
            }
            SieveError::IntegerOverflow => write!(f, "varint too wide for u64"),
            SieveError::OffsetOutOfRange { offset, block_size } => write!(
                f,
                "offset {offset} out of range for block of size {block_size}"
            ),
            SieveError::UnknownOpCode(code) => write!(f, "unknown opcode {code}"),
            SieveError::UnknownExtension(idx) => {
                write!(f, "unknown extension index {idx}")
            }
            SieveError::UnsupportedComparator { match_type, comparator } => write!(
                f,
                "match type {match_type} does not support comparator {comparator}"
            ),
            SieveError::LoopDepthExceeded => write!(f, "loop nesting depth exceeded"),
            SieveError::LoopStackMismatch => {
                write!(f, "loop begin/end did not match top of loop stack")
            }
        }
    }
}

impl std::error::Error for SieveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SieveError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SieveError {
    fn from(e: io::Error) -> Self {
        SieveError::Io(e)
    }
}

pub type SieveResult<T> = Result<T, SieveError>;

/// The outcome of running (a slice of) bytecode. Mirrors the five-way
/// status an operation's execution can produce; the interpreter's main
/// loop short-circuits on anything other than `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Ok,
    Failure,
    TempFailure,
    BinCorrupt,
    KeepFailed,
}

impl ExecStatus {
    pub fn is_ok(self) -> bool {
        matches!(self, ExecStatus::Ok)
    }
}
