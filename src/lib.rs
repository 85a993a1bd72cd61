//! User-level threads on a single kernel thread
//!
//! Multiplexes many logical threads of control onto one OS thread by saving
//! and restoring register context in user space. Preemption is driven by the
//! virtual-time interval timer (`ITIMER_VIRTUAL`): each thread runs for a
//! quantum of CPU time selected by its priority, then `SIGVTALRM` hands
//! control to the scheduler, which picks the next thread from a FIFO ready
//! queue and resumes its saved context.
//!
//! The calling context of [`init`] becomes thread 0, the main thread. It has
//! no library-owned stack and lives until the process exits. Every other
//! thread is created with [`spawn`], owns a fixed [`STACK_SIZE`]-byte stack,
//! and is destroyed by [`terminate`].
//!
//! Everything executes on one kernel thread; no two user threads ever run
//! simultaneously. Library state is protected by masking `SIGVTALRM` around
//! every public operation, not by locks.
//!
//! # Example
//!
//! ```no_run
//! extern "C" fn worker() {
//!     loop {
//!         // do work; the timer preempts this thread transparently
//!     }
//! }
//!
//! uthreads::init(&[1000]).unwrap();
//! let tid = uthreads::spawn(worker, 0).unwrap();
//! uthreads::block(tid).unwrap();
//! uthreads::resume(tid).unwrap();
//! ```

mod api;
mod arch;
mod error;
mod sched;
mod signals;
mod thread;

pub use api::{
    block, change_priority, get_quantums, get_tid, get_total_quantums, init, resume, spawn,
    terminate,
};
pub use error::{Error, Result};
pub use thread::Tid;

/// Maximum number of concurrently live threads, the main thread included.
pub const MAX_THREAD_NUM: usize = 100;

/// Stack size in bytes allocated for each spawned thread.
///
/// Sized so that a preemption, whose signal frame the kernel writes onto
/// the running thread's stack, always fits below a working call depth.
pub const STACK_SIZE: usize = 16 * 1024;
