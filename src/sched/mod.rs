//! Scheduling: ready queue, runtime singleton, and the scheduler itself

mod queue;
mod runtime;

pub(crate) use queue::ReadyQueue;
pub(crate) use runtime::{
    release_all, runtime_mut, schedule, timer_signal_handler, Runtime, SwitchReason,
};
