//! Public operations
//!
//! Every operation runs with the timer signal masked, so the runtime is
//! never touched concurrently with the scheduler. Operations that suspend
//! the caller (self-block, self-terminate) park the handler disposition and
//! enter the scheduler directly; everything else mutates and returns.
//!
//! User errors print a `thread library error: ` diagnostic to stderr and
//! come back as [`Err`]; the library state is untouched by a failed call.

use crate::error::{fail, Error, Result};
use crate::sched::{self, Runtime, SwitchReason};
use crate::signals;
use crate::thread::{State, Thread, Tid};

/// Runs `f` on the initialized runtime, under the signal mask.
fn with_runtime<T>(f: impl FnOnce(&mut Runtime) -> Result<T>) -> Result<T> {
    signals::masked(|| match unsafe { sched::runtime_mut() }.as_mut() {
        Some(rt) => f(rt),
        None => fail(Error::NotInitialized),
    })
}

/// Initializes the thread library.
///
/// `quanta` holds one quantum length in microseconds per priority level;
/// a thread of priority `p` runs for `quanta[p]` of CPU time before being
/// preempted. The calling context becomes thread 0, the main thread, and
/// its first quantum starts counting immediately: `get_total_quantums`
/// returns 1 right after this call.
///
/// Must be called exactly once, before any other library function.
///
/// # Errors
///
/// `EmptyQuantumTable` for an empty slice, `NonPositiveQuantum` if any
/// entry is zero or negative, `AlreadyInitialized` on a second call. A
/// failed `sigaction` is a system error and terminates the process.
pub fn init(quanta: &[i32]) -> Result<()> {
    if quanta.is_empty() {
        return fail(Error::EmptyQuantumTable);
    }
    if quanta.iter().any(|&quantum| quantum <= 0) {
        return fail(Error::NonPositiveQuantum);
    }

    signals::masked(|| {
        let slot = unsafe { sched::runtime_mut() };
        if slot.is_some() {
            return fail(Error::AlreadyInitialized);
        }
        *slot = Some(Runtime::new(quanta.to_vec()));
        Ok(())
    })?;

    log::debug!("initialized with {} priority levels", quanta.len());

    // No timer is armed yet, so the handler cannot fire before bootstrap
    // accounts the main thread's first quantum and arms it.
    signals::install(sched::timer_signal_handler);
    sched::schedule(SwitchReason::Bootstrap);
    Ok(())
}

/// Creates a thread entering `entry` and appends it to the ready queue.
///
/// The thread gets the lowest free id (ids are reused after termination)
/// and a fresh stack of [`STACK_SIZE`](crate::STACK_SIZE) bytes. If `entry`
/// returns, the thread terminates itself.
///
/// # Errors
///
/// `InvalidPriority` if `priority` does not index the quantum table,
/// `TooManyThreads` once [`MAX_THREAD_NUM`](crate::MAX_THREAD_NUM) threads
/// are live.
pub fn spawn(entry: extern "C" fn(), priority: usize) -> Result<Tid> {
    with_runtime(|rt| {
        if priority >= rt.levels() {
            return fail(Error::InvalidPriority {
                priority,
                levels: rt.levels(),
            });
        }
        let tid = match rt.table.allocate() {
            Ok(tid) => tid,
            Err(err) => return fail(err),
        };
        rt.table.insert(Box::new(Thread::spawned(tid, priority, entry)));
        rt.ready.push_back(tid);
        log::debug!("spawned thread {tid} at priority {priority}");
        Ok(tid)
    })
}

/// Terminates the thread `tid` and releases everything it owns.
///
/// Terminating the main thread (`tid == 0`) releases the whole library and
/// exits the process with status 0. A thread terminating itself does not
/// return from this call: its stack is parked in the garbage cell and freed
/// once the scheduler has switched onto another stack.
///
/// # Errors
///
/// `NoSuchThread` if no live thread carries `tid`.
pub fn terminate(tid: Tid) -> Result<()> {
    if tid == 0 {
        log::debug!("terminating the main thread; process exits");
        signals::ignore();
        sched::release_all();
        std::process::exit(0);
    }

    signals::masked(|| {
        let Some(rt) = (unsafe { sched::runtime_mut() }).as_mut() else {
            return fail(Error::NotInitialized);
        };
        if rt.table.get(tid).is_none() {
            return fail(Error::NoSuchThread { tid });
        }

        if rt.running == Some(tid) {
            // Self-destruction: the stack under our feet cannot be freed
            // until execution has moved off it, so the descriptor goes to
            // the garbage cell and the scheduler skips the save step.
            log::debug!("thread {tid} terminating itself");
            signals::ignore();
            rt.running = None;
            rt.garbage = rt.table.take(tid);
            sched::schedule(SwitchReason::YieldForSelfTerminate);
            unreachable!("self-terminated thread kept executing");
        }

        rt.ready.remove(tid);
        drop(rt.table.take(tid));
        log::debug!("terminated thread {tid}");
        Ok(())
    })
}

/// Moves the thread `tid` to the Blocked state.
///
/// Blocking an already-Blocked thread is a no-op success. A thread blocking
/// itself gives up the CPU; the call returns when some other thread
/// [`resume`]s it.
///
/// # Errors
///
/// `BlockMainThread` for `tid == 0`, `NoSuchThread` for a dead id.
pub fn block(tid: Tid) -> Result<()> {
    with_runtime(|rt| {
        if tid == 0 {
            return fail(Error::BlockMainThread);
        }
        let Some(thread) = rt.table.get_mut(tid) else {
            return fail(Error::NoSuchThread { tid });
        };
        match thread.state() {
            State::Blocked => Ok(()),
            State::Running => {
                // Blocking ourselves: suspend through the scheduler. The
                // Blocked state keeps the save step from re-queueing us.
                thread.set_state(State::Blocked);
                log::debug!("thread {tid} blocking itself");
                signals::ignore();
                sched::schedule(SwitchReason::YieldForBlock);
                Ok(())
            }
            State::Ready => {
                thread.set_state(State::Blocked);
                rt.ready.remove(tid);
                log::debug!("blocked thread {tid}");
                Ok(())
            }
        }
    })
}

/// Moves a Blocked thread back to Ready, at the back of the ready queue.
///
/// Resuming a Ready or Running thread is a no-op success.
///
/// # Errors
///
/// `NoSuchThread` if no live thread carries `tid`.
pub fn resume(tid: Tid) -> Result<()> {
    with_runtime(|rt| {
        let Some(thread) = rt.table.get_mut(tid) else {
            return fail(Error::NoSuchThread { tid });
        };
        if thread.state().is_blocked() {
            thread.set_state(State::Ready);
            rt.ready.push_back(tid);
            log::debug!("resumed thread {tid}");
        }
        Ok(())
    })
}

/// Changes the priority of thread `tid`.
///
/// The quantum length is selected when a thread is scheduled, so the change
/// takes effect the next time `tid` gets the CPU; a currently running
/// thread finishes its old quantum first.
///
/// # Errors
///
/// `NoSuchThread` for a dead id, `InvalidPriority` for an out-of-range
/// priority.
pub fn change_priority(tid: Tid, priority: usize) -> Result<()> {
    with_runtime(|rt| {
        if priority >= rt.levels() {
            return fail(Error::InvalidPriority {
                priority,
                levels: rt.levels(),
            });
        }
        let Some(thread) = rt.table.get_mut(tid) else {
            return fail(Error::NoSuchThread { tid });
        };
        thread.set_priority(priority);
        Ok(())
    })
}

/// Id of the calling thread.
pub fn get_tid() -> Result<Tid> {
    with_runtime(|rt| {
        let Some(tid) = rt.running else {
            unreachable!("no running thread outside the scheduler");
        };
        Ok(tid)
    })
}

/// Total number of quanta started since [`init`], the current one included.
pub fn get_total_quantums() -> Result<u64> {
    with_runtime(|rt| Ok(rt.total_quantums))
}

/// Number of quanta thread `tid` has spent Running, the current one
/// included if it is running right now.
///
/// # Errors
///
/// `NoSuchThread` if no live thread carries `tid`.
pub fn get_quantums(tid: Tid) -> Result<u64> {
    with_runtime(|rt| match rt.table.get(tid) {
        Some(thread) => Ok(thread.quantums()),
        None => fail(Error::NoSuchThread { tid }),
    })
}

/// Landing point for a thread entry function that returns: the synthetic
/// return slot under every entry frame points here (through an aligning
/// shim), ending the thread as an explicit self-`terminate` would.
#[no_mangle]
extern "C" fn uthreads_thread_exit() -> ! {
    let tid = get_tid().unwrap_or(0);
    let _ = terminate(tid);
    unreachable!("terminated thread kept executing");
}
