//! Helpers shared by the scenario binaries.
//!
//! Waiting is done by burning user CPU: the virtual timer only advances on
//! CPU time this process consumes, so a sleeping waiter would stall the
//! whole scenario.

#![allow(dead_code)]

/// Upper bound on how many quanta a scenario may wait for one condition
/// before declaring the run stuck.
const WAIT_QUANTA_LIMIT: u64 = 2_000;

/// Burns user-mode CPU so the virtual timer keeps ticking.
pub fn spin(iterations: u64) {
    for _ in 0..iterations {
        std::hint::black_box(0u64);
    }
}

/// Spins until `cond` holds, failing the scenario if it takes more than
/// `WAIT_QUANTA_LIMIT` quanta of total virtual time.
pub fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let start = uthreads::get_total_quantums().expect("library is initialized");
    while !cond() {
        spin(1_000);
        let now = uthreads::get_total_quantums().expect("library is initialized");
        assert!(
            now - start < WAIT_QUANTA_LIMIT,
            "gave up waiting for: {what}"
        );
    }
}

/// Spins until at least `quanta` more total quanta have started.
pub fn wait_quanta(quanta: u64) {
    let start = uthreads::get_total_quantums().expect("library is initialized");
    wait_until("quantum count to advance", || {
        uthreads::get_total_quantums().expect("library is initialized") >= start + quanta
    });
}
