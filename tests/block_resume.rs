//! Scenario: blocked threads never run until resumed, whether blocked from
//! outside or by themselves.

mod common;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use common::{spin, wait_quanta, wait_until};

static HEARTBEAT: AtomicU64 = AtomicU64::new(0);
static SELF_BLOCKER_ENTERED: AtomicBool = AtomicBool::new(false);
static SELF_BLOCKER_RESUMED: AtomicBool = AtomicBool::new(false);

extern "C" fn heartbeat_worker() {
    loop {
        HEARTBEAT.fetch_add(1, Ordering::Relaxed);
        spin(200);
    }
}

extern "C" fn self_blocking_worker() {
    let me = uthreads::get_tid().unwrap();
    SELF_BLOCKER_ENTERED.store(true, Ordering::SeqCst);
    uthreads::block(me).unwrap();
    // Only a resume from another thread brings control back here.
    SELF_BLOCKER_RESUMED.store(true, Ordering::SeqCst);
    loop {
        spin(1_000);
    }
}

fn main() {
    uthreads::init(&[1_000]).unwrap();

    assert_eq!(
        uthreads::block(0),
        Err(uthreads::Error::BlockMainThread),
        "the main thread must refuse to block"
    );
    assert_eq!(
        uthreads::block(55),
        Err(uthreads::Error::NoSuchThread { tid: 55 })
    );

    // Externally blocked thread disappears from the execution trace.
    let worker = uthreads::spawn(heartbeat_worker, 0).unwrap();
    wait_until("the worker's first quantum", || {
        uthreads::get_quantums(worker).unwrap() >= 1
    });

    uthreads::block(worker).unwrap();
    uthreads::block(worker).unwrap(); // blocking a Blocked thread: no-op

    let frozen_quantums = uthreads::get_quantums(worker).unwrap();
    let frozen_heartbeat = HEARTBEAT.load(Ordering::Relaxed);
    wait_quanta(4);
    assert_eq!(
        uthreads::get_quantums(worker).unwrap(),
        frozen_quantums,
        "a blocked thread must not be scheduled"
    );
    assert_eq!(
        HEARTBEAT.load(Ordering::Relaxed),
        frozen_heartbeat,
        "a blocked thread must not execute"
    );

    // Resuming moves it back to Ready with its accounting intact; a second
    // resume of a non-blocked thread changes nothing.
    uthreads::resume(worker).unwrap();
    uthreads::resume(worker).unwrap();
    assert_eq!(uthreads::get_quantums(worker).unwrap(), frozen_quantums);

    wait_until("the worker to run again", || {
        HEARTBEAT.load(Ordering::Relaxed) > frozen_heartbeat
    });

    // A thread blocking itself suspends inside the block call and continues
    // from it on resume. Resume no-ops harmlessly until it has actually
    // blocked, so keep resuming.
    let blocker = uthreads::spawn(self_blocking_worker, 0).unwrap();
    wait_until("the self-blocker to start", || {
        SELF_BLOCKER_ENTERED.load(Ordering::SeqCst)
    });
    wait_until("the self-blocker to wake", || {
        uthreads::resume(blocker).unwrap();
        SELF_BLOCKER_RESUMED.load(Ordering::SeqCst)
    });

    println!("block/resume scenario: ok");
    let _ = uthreads::terminate(0);
}
