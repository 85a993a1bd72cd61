//! Runtime state and the scheduler
//!
//! All process-wide state lives in one [`Runtime`] value: the thread table,
//! the ready queue, the running pointer, the single-slot garbage cell for
//! deferred destruction, the quantum table, and the total quantum counter.
//!
//! The runtime sits in a process-wide cell rather than behind a lock: the
//! scheduler suspends flows of control mid-function, and a lock guard taken
//! before a save point would be "released" again by whichever flow is
//! resumed into it. Exclusive access is guaranteed the old-fashioned way:
//! every library function runs with the timer signal masked or ignored, and
//! the only other entrant is the signal handler itself.

use std::cell::UnsafeCell;

use crate::arch::{self, SavePoint};
use crate::error;
use crate::signals;
use crate::thread::{State, Thread, ThreadTable, Tid};

use super::ReadyQueue;

/// Why the scheduler was entered. The algorithm branches on runtime state,
/// not on the reason; this exists for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchReason {
    /// The running thread's quantum expired.
    TimerExpired,
    /// The running thread blocked itself.
    YieldForBlock,
    /// The running thread destroyed itself; its descriptor is in the
    /// garbage cell and `running` is empty.
    YieldForSelfTerminate,
    /// First entry from `init`: accounts the main thread's first quantum
    /// and arms the first timer.
    Bootstrap,
}

/// Process-wide library state.
pub struct Runtime {
    pub table: ThreadTable,
    pub ready: ReadyQueue,
    pub running: Option<Tid>,
    /// Descriptor of a self-terminated thread, parked until execution has
    /// moved off its stack. Capacity one; emptied on every switch.
    pub garbage: Option<Box<Thread>>,
    /// Quantum length in microseconds per priority level.
    quanta: Vec<i32>,
    pub total_quantums: u64,
}

impl Runtime {
    /// Fresh runtime with descriptor 0 (the calling context) Running.
    pub fn new(quanta: Vec<i32>) -> Self {
        let mut table = ThreadTable::new();
        table.insert(Box::new(Thread::main()));
        Runtime {
            table,
            ready: ReadyQueue::new(),
            running: Some(0),
            garbage: None,
            quanta,
            total_quantums: 0,
        }
    }

    /// Number of priority levels.
    pub fn levels(&self) -> usize {
        self.quanta.len()
    }

    fn quantum_for(&self, priority: usize) -> i32 {
        self.quanta[priority]
    }
}

struct RuntimeCell(UnsafeCell<Option<Runtime>>);

// SAFETY: the library runs on exactly one kernel thread, and every access
// to the cell happens either with SIGVTALRM masked/ignored or inside the
// signal handler itself, so no two accesses ever interleave.
unsafe impl Sync for RuntimeCell {}

static RUNTIME: RuntimeCell = RuntimeCell(UnsafeCell::new(None));

/// Exclusive access to the runtime slot.
///
/// # Safety
///
/// The caller must hold the library's single flow of control: run under
/// [`signals::masked`], with the handler disposition ignored, or inside the
/// signal handler. No reference returned earlier may still be in use.
pub(crate) unsafe fn runtime_mut() -> &'static mut Option<Runtime> {
    &mut *RUNTIME.0.get()
}

/// `SIGVTALRM` entry point: a quantum expired.
pub(crate) extern "C" fn timer_signal_handler(_sig: libc::c_int) {
    eprintln!("DEBUG: timer_signal_handler fired");
    schedule(SwitchReason::TimerExpired);
}

/// Picks and resumes the next thread.
///
/// Entered from the signal handler on timer expiry, or directly (with the
/// handler disposition set to ignore) on bootstrap, self-block, and
/// self-terminate. Returns only on the resumed side of a save point, that
/// is, when this thread is next given the CPU.
pub(crate) fn schedule(reason: SwitchReason) {
    let Some(rt) = (unsafe { runtime_mut() }).as_mut() else {
        // Delivery raced teardown; nothing left to schedule.
        return;
    };

    log::trace!("schedule: reason={reason:?}, ready={}", rt.ready.len());

    // Save the suspending thread's context, unless it already destroyed
    // itself (running empty, descriptor in the garbage cell). A thread that
    // blocked itself is saved like any other: resume must continue from its
    // block call, it is merely not re-queued below.
    if let Some(tid) = rt.running {
        debug_assert!(rt.garbage.is_none(), "garbage cell occupied at save");
        let Some(current) = rt.table.get_mut(tid) else {
            unreachable!("running thread {tid} has no table slot");
        };
        if unsafe { arch::save(current.context_mut()) } == SavePoint::Resumed {
            // The far side of a switch: this thread has the CPU again.
            wake();
            return;
        }
    }

    // Choose the next runnable thread. An empty queue keeps the previous
    // thread running (only the main thread alone, or everyone else
    // blocked); an empty queue with nobody running is a deadlock.
    if let Some(next) = rt.ready.pop_front() {
        if let Some(prev) = rt.running {
            if let Some(thread) = rt.table.get_mut(prev) {
                if !thread.state().is_blocked() {
                    thread.set_state(State::Ready);
                    rt.ready.push_back(prev);
                }
            }
        }
        if let Some(thread) = rt.table.get_mut(next) {
            thread.set_state(State::Running);
        }
        rt.running = Some(next);
    }
    let Some(current) = rt.running else {
        error::fatal("no runnable thread left");
    };

    // A new quantum starts now, whoever won it.
    rt.total_quantums += 1;
    let Some(thread) = rt.table.get_mut(current) else {
        unreachable!("scheduled thread {current} has no table slot");
    };
    thread.start_quantum();
    let priority = thread.priority();
    eprintln!("DEBUG: current={current} priority={priority} table.get(current) present before arm={}", rt.table.get(current).is_some());

    log::trace!(
        "schedule: running tid={current} (priority {priority}), total quantums {}",
        rt.total_quantums
    );

    signals::arm_timer(rt.quantum_for(priority));
    eprintln!("DEBUG: after arm_timer, table.get(current) present={} rt_ptr={:p} slot_ptr={:p}", rt.table.get(current).is_some(), rt as *const _, &rt.table as *const _);
    eprintln!("DEBUG: repeat check present={}", rt.table.get(current).is_some());
    eprintln!("DEBUG: repeat check2 present={}", rt.table.get(current).is_some());

    let Some(thread) = rt.table.get(current) else {
        unreachable!("scheduled thread {current} has no table slot");
    };
    unsafe { arch::resume(thread.context_ptr()) }
}

/// Resumed-path housekeeping: runs in the context of the thread that just
/// received the CPU, before control returns to user code.
fn wake() {
    // The suspension may have parked the handler (manual scheduler entry),
    // so reinstall it before anything else.
    signals::install(timer_signal_handler);

    if let Some(rt) = (unsafe { runtime_mut() }).as_mut() {
        if rt.garbage.take().is_some() {
            log::trace!("wake: released self-terminated thread");
        }
    }

    // The suspension may also have left SIGVTALRM blocked in the process
    // mask (handler entry or a masked section); clearing it last keeps a
    // pending expiry from re-entering the scheduler over a full garbage
    // cell. This is the counterpart of `siglongjmp` restoring the saved
    // mask.
    signals::unblock();
}

/// Drops the whole runtime, for process teardown (`terminate(0)` or a
/// system error).
///
/// The current thread's descriptor is leaked rather than freed: execution
/// may be standing on its stack, and the imminent process exit reclaims it
/// anyway.
pub(crate) fn release_all() {
    let Some(mut rt) = (unsafe { runtime_mut() }).take() else {
        return;
    };
    if let Some(tid) = rt.running {
        if let Some(current) = rt.table.take(tid) {
            std::mem::forget(current);
        }
    }
    drop(rt);
}
