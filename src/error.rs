//! Library errors and diagnostics
//!
//! Two classes of failure. User errors (bad arguments, unknown thread ids,
//! a full thread table) are reported on stderr with the `thread library
//! error: ` prefix and returned to the caller; library state is unchanged.
//! System errors (a failed `sigaction` or `setitimer`) are reported with the
//! `system error: ` prefix, every live descriptor is released, and the
//! process exits with status 1. There is no partial-failure state.

use thiserror::Error;

use crate::thread::Tid;

const LIB_ERROR_PREFIX: &str = "thread library error: ";
const SYS_ERROR_PREFIX: &str = "system error: ";

/// Result type for every public library operation.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors a public operation can return.
///
/// Each variant corresponds to one rejected input or state; none of them
/// leaves the library in a partially-updated state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A library function was called before [`init`](crate::init).
    #[error("library not initialized")]
    NotInitialized,

    /// [`init`](crate::init) was called a second time.
    #[error("library already initialized")]
    AlreadyInitialized,

    /// The quantum table passed to [`init`](crate::init) was empty.
    #[error("invalid size value")]
    EmptyQuantumTable,

    /// A quantum in the table was zero or negative.
    #[error("invalid quantum value")]
    NonPositiveQuantum,

    /// The priority does not index into the quantum table.
    #[error("invalid priority {priority} (have {levels} levels)")]
    InvalidPriority {
        /// The rejected priority.
        priority: usize,
        /// Number of entries in the quantum table.
        levels: usize,
    },

    /// No live thread carries this id.
    #[error("no thread with id {tid}")]
    NoSuchThread {
        /// The id that resolved to no descriptor.
        tid: Tid,
    },

    /// The thread table already holds the maximum number of live threads.
    #[error("too many threads (limit {max})")]
    TooManyThreads {
        /// The table capacity.
        max: usize,
    },

    /// The main thread (id 0) cannot be blocked.
    #[error("the main thread cannot be blocked")]
    BlockMainThread,
}

/// Writes the diagnostic line for a user error and hands it back, so call
/// sites read `return fail(Error::...)`.
pub(crate) fn fail<T>(err: Error) -> Result<T> {
    eprintln!("{LIB_ERROR_PREFIX}{err}");
    Err(err)
}

/// System-error exit: diagnostic, full release of library memory, status 1.
///
/// The descriptor of the thread whose stack is currently executing is leaked
/// instead of freed; process exit reclaims it.
pub(crate) fn fatal(what: &str) -> ! {
    eprintln!("{SYS_ERROR_PREFIX}{what}");
    crate::sched::release_all();
    std::process::exit(1);
}
