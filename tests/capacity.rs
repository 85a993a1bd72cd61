//! Scenario: the thread table holds MAX_THREAD_NUM threads including main,
//! rejects the one over, and reuses freed slots.
//!
//! Main's quantum is long enough that every step below normally happens
//! inside its first quantum; the parked workers get a tiny quantum so that
//! even a stray preemption costs a rotation of milliseconds, not minutes.

mod common;

use common::spin;
use uthreads::MAX_THREAD_NUM;

extern "C" fn parked() {
    loop {
        spin(10_000);
    }
}

fn main() {
    uthreads::init(&[1_000_000, 500]).unwrap();

    assert_eq!(
        uthreads::spawn(parked, 2),
        Err(uthreads::Error::InvalidPriority {
            priority: 2,
            levels: 2
        })
    );

    // Main holds slot 0; the other MAX_THREAD_NUM - 1 spawn fine.
    for expected in 1..MAX_THREAD_NUM {
        assert_eq!(uthreads::spawn(parked, 1).unwrap(), expected);
    }
    assert_eq!(
        uthreads::spawn(parked, 1),
        Err(uthreads::Error::TooManyThreads {
            max: MAX_THREAD_NUM
        })
    );

    // Freeing any slot makes the table accept exactly one more.
    uthreads::terminate(57).unwrap();
    assert_eq!(uthreads::spawn(parked, 1).unwrap(), 57);
    assert_eq!(
        uthreads::spawn(parked, 1),
        Err(uthreads::Error::TooManyThreads {
            max: MAX_THREAD_NUM
        })
    );

    println!("capacity scenario: ok");
    let _ = uthreads::terminate(0);
}
