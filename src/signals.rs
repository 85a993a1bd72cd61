//! Signal and timer plumbing
//!
//! The one OS-facing module. Preemption rides on `SIGVTALRM`, delivered
//! when the one-shot `ITIMER_VIRTUAL` interval timer runs out of the
//! current thread's quantum of CPU time.
//!
//! Two suppression mechanisms guard the library state, mirroring how they
//! are used: [`masked`] blocks the signal around short mutations in public
//! operations, and [`ignore`] parks the handler disposition while a public
//! operation enters the scheduler manually (self-block, self-terminate).
//! The scheduler reinstalls the live handler with [`install`] and clears
//! the mask with [`unblock`] on every resumed path, so the next timer
//! expiry preempts again no matter which path suspended the thread.

use std::mem;
use std::ptr;

use crate::error;

/// Signature the kernel delivers `SIGVTALRM` to.
pub(crate) type Handler = extern "C" fn(libc::c_int);

fn timer_sigset() -> libc::sigset_t {
    unsafe {
        let mut set: libc::sigset_t = mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGVTALRM);
        set
    }
}

fn set_disposition(disposition: libc::sighandler_t) {
    unsafe {
        let mut sa: libc::sigaction = mem::zeroed();
        sa.sa_sigaction = disposition;
        libc::sigemptyset(&mut sa.sa_mask);
        if libc::sigaction(libc::SIGVTALRM, &sa, ptr::null_mut()) < 0 {
            error::fatal("sigaction failed");
        }
    }
}

/// Installs `handler` as the `SIGVTALRM` disposition. Failure is fatal.
pub(crate) fn install(handler: Handler) {
    set_disposition(handler as usize as libc::sighandler_t);
}

/// Discards timer expiries until the handler is reinstalled. Used around
/// manual scheduler entries, which must not be raced by a delivery.
pub(crate) fn ignore() {
    set_disposition(libc::SIG_IGN);
}

/// Runs `f` with `SIGVTALRM` blocked, restoring the previous mask after.
/// Nests; an inner call leaves the signal blocked for the outer one.
pub(crate) fn masked<T>(f: impl FnOnce() -> T) -> T {
    let set = timer_sigset();
    let mut old: libc::sigset_t = unsafe { mem::zeroed() };
    unsafe { libc::sigprocmask(libc::SIG_BLOCK, &set, &mut old) };
    let out = f();
    unsafe { libc::sigprocmask(libc::SIG_SETMASK, &old, ptr::null_mut()) };
    out
}

/// Removes `SIGVTALRM` from the process mask.
///
/// A resumed thread may wake up with the mask it was suspended under (a
/// handler entry or a [`masked`] section); this is the counterpart of
/// `siglongjmp` restoring the saved mask.
pub(crate) fn unblock() {
    let set = timer_sigset();
    unsafe { libc::sigprocmask(libc::SIG_UNBLOCK, &set, ptr::null_mut()) };
}

/// Arms the one-shot virtual timer for `usecs` microseconds of CPU time.
/// Rearmed on every context switch, which is why a priority change only
/// takes effect at the next schedule. Failure is fatal.
pub(crate) fn arm_timer(usecs: i32) {
    let timer = libc::itimerval {
        it_interval: libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        },
        it_value: libc::timeval {
            tv_sec: (usecs / 1_000_000) as libc::time_t,
            tv_usec: (usecs % 1_000_000) as libc::suseconds_t,
        },
    };
    if unsafe { libc::setitimer(libc::ITIMER_VIRTUAL, &timer, ptr::null_mut()) } < 0 {
        error::fatal("itimer failed");
    }
}
