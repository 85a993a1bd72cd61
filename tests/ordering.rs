//! Scenario: two threads of different priorities receive control in strict
//! FIFO order, alternating with each other regardless of quantum length.
//!
//! Each worker marks every quantum it runs in a bitmask indexed by the
//! global quantum number, so the merged masks give the exact execution
//! order no matter when a mark lands: a worker preempted between observing
//! its quantum and marking it still marks the right slot next time it runs.
//! The checker accepts the order only once it has stayed stable for a few
//! quanta, which outlasts any in-flight mark.

mod common;

use std::sync::atomic::{AtomicU64, Ordering};

use common::{spin, wait_quanta, wait_until};

/// Quantum-number bitmask per worker. Atomics only: a lock held across a
/// preemption would wedge the process.
static FIRST_MASK: AtomicU64 = AtomicU64::new(0);
static SECOND_MASK: AtomicU64 = AtomicU64::new(0);

/// `(own quanta, total quanta)` read consistently: the total only moves
/// while someone else runs, so bracketing reads detect a preemption.
fn snapshot(tid: uthreads::Tid) -> (u64, u64) {
    loop {
        let before = uthreads::get_total_quantums().unwrap();
        let own = uthreads::get_quantums(tid).unwrap();
        let after = uthreads::get_total_quantums().unwrap();
        if before == after {
            return (own, before);
        }
    }
}

/// Marks each quantum this thread runs, keyed by the total counter at the
/// time the quantum started.
fn observe(mask: &AtomicU64) -> ! {
    let me = uthreads::get_tid().unwrap();
    let mut last = 0;
    loop {
        let (own, total) = snapshot(me);
        if own != last {
            if total < 64 {
                mask.fetch_or(1 << total, Ordering::SeqCst);
            }
            last = own;
        }
        spin(200);
    }
}

extern "C" fn first_worker() {
    observe(&FIRST_MASK)
}

extern "C" fn second_worker() {
    observe(&SECOND_MASK)
}

/// Worker quanta observed so far, in execution order: `false` for the
/// first worker, `true` for the second.
fn worker_sequence() -> Vec<bool> {
    let first = FIRST_MASK.load(Ordering::SeqCst);
    let second = SECOND_MASK.load(Ordering::SeqCst);
    assert_eq!(first & second, 0, "a quantum belongs to exactly one thread");

    (0..64)
        .filter_map(|total| {
            if first >> total & 1 != 0 {
                Some(false)
            } else if second >> total & 1 != 0 {
                Some(true)
            } else {
                None // a main quantum, or a mark still in flight
            }
        })
        .collect()
}

fn main() {
    uthreads::init(&[1_000, 2_000]).unwrap();

    let first = uthreads::spawn(first_worker, 0).unwrap();
    let second = uthreads::spawn(second_worker, 1).unwrap();
    assert_eq!((first, second), (1, 2));

    // Wait for six worker quanta, then for the record of them to stop
    // moving: an in-flight mark lands within one round of scheduling, so a
    // four-quantum quiet period means the prefix is final.
    let mut settled = Vec::new();
    wait_until("six settled worker quanta", || {
        let seen = worker_sequence();
        if seen.len() < 6 {
            return false;
        }
        wait_quanta(4);
        let confirmed = worker_sequence();
        if confirmed[..6] == seen[..6] {
            settled = confirmed;
            true
        } else {
            false
        }
    });

    // Spawned in the order first, second; re-queued in the same order on
    // every expiry. Priority changed their quantum lengths, not their turn.
    for (position, &is_second) in settled.iter().take(6).enumerate() {
        assert_eq!(
            is_second,
            position % 2 == 1,
            "trace diverged from FIFO alternation at worker quantum {position}"
        );
    }

    println!("ordering scenario: ok");
    let _ = uthreads::terminate(0);
}
