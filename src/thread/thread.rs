//! Thread descriptor
//!
//! Identity, priority, state, quantum accounting, and the saved machine
//! context. The main thread (id 0) is the context that called `init`: it
//! runs on the OS-provided stack and owns none of its own.

use crate::arch::{self, Context};

use super::{Stack, State};

/// Thread identifier: a small index into the thread table, reused after
/// termination. Id 0 is always the main thread.
pub type Tid = usize;

/// Per-thread bookkeeping and saved context.
pub struct Thread {
    id: Tid,
    priority: usize,
    state: State,
    /// Quanta this thread has spent Running, the current one included.
    quantums: u64,
    context: Context,
    /// Owned stack; `None` for the main thread, which keeps the OS stack.
    stack: Option<Stack>,
}

impl Thread {
    /// Descriptor for the main thread: the flow of control that is already
    /// executing, so no stack and no prepared entry point.
    pub fn main() -> Self {
        Thread {
            id: 0,
            priority: 0,
            state: State::Running,
            quantums: 0,
            context: Context::zeroed(),
            stack: None,
        }
    }

    /// Descriptor for a spawned thread: fresh stack, context prepared to
    /// enter `entry` at first resume.
    pub fn spawned(id: Tid, priority: usize, entry: extern "C" fn()) -> Self {
        let stack = Stack::new();
        let context = unsafe { arch::prepare(entry, stack.base(), stack.size()) };
        Thread {
            id,
            priority,
            state: State::Ready,
            quantums: 0,
            context,
            stack: Some(stack),
        }
    }

    pub fn id(&self) -> Tid {
        self.id
    }

    pub fn priority(&self) -> usize {
        self.priority
    }

    pub fn set_priority(&mut self, priority: usize) {
        self.priority = priority;
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub fn quantums(&self) -> u64 {
        self.quantums
    }

    /// Accounts the quantum that is starting now.
    pub fn start_quantum(&mut self) {
        self.quantums += 1;
    }

    pub fn context_mut(&mut self) -> *mut Context {
        &mut self.context
    }

    pub fn context_ptr(&self) -> *const Context {
        &self.context
    }
}
