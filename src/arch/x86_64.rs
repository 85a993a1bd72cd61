//! x86-64 System-V context switching
//!
//! A context is the callee-saved register set plus stack and instruction
//! pointers. Saving it at a call boundary is enough to suspend a flow of
//! control: the caller-saved registers are already dead per the ABI.
//!
//! `uthreads_ctx_save` stores the registers and returns 0; a later
//! `uthreads_ctx_resume` reloads them and re-executes the save's return with
//! 1 in `rax`, so the saved flow wakes up seeing the other tag.

use std::arch::global_asm;

/// Saved register state of a suspended thread.
///
/// Field order is the assembly's load/store order; keep the two in sync.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Context {
    rbx: u64,
    rbp: u64,
    r12: u64,
    r13: u64,
    r14: u64,
    r15: u64,
    rsp: u64,
    rip: u64,
}

impl Context {
    pub const fn zeroed() -> Self {
        Self {
            rbx: 0,
            rbp: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
            rsp: 0,
            rip: 0,
        }
    }

    #[cfg(test)]
    fn rsp(&self) -> u64 {
        self.rsp
    }

    #[cfg(test)]
    fn rip(&self) -> u64 {
        self.rip
    }
}

/// Which side of a context switch [`save`] returned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePoint {
    /// The context was just recorded; execution continues past the save.
    Saved,
    /// Control arrived here through [`resume`] of the recorded context.
    Resumed,
}

extern "C" {
    fn uthreads_ctx_save(ctx: *mut Context) -> u64;
    fn uthreads_ctx_resume(ctx: *const Context) -> !;
    fn uthreads_thread_landing();
}

global_asm!(
    r#"
    .text

    // u64 uthreads_ctx_save(Context *rdi)
    //
    // Records the callee-saved registers together with the stack and
    // instruction pointers as they will be after this call returns, then
    // reports 0. uthreads_ctx_resume re-enters at that same return point
    // reporting 1.
    .globl uthreads_ctx_save
uthreads_ctx_save:
    mov [rdi + 0x00], rbx
    mov [rdi + 0x08], rbp
    mov [rdi + 0x10], r12
    mov [rdi + 0x18], r13
    mov [rdi + 0x20], r14
    mov [rdi + 0x28], r15
    lea rax, [rsp + 8]
    mov [rdi + 0x30], rax
    mov rax, [rsp]
    mov [rdi + 0x38], rax
    xor eax, eax
    ret

    // void uthreads_ctx_resume(const Context *rdi)  (noreturn)
    .globl uthreads_ctx_resume
uthreads_ctx_resume:
    mov rbx, [rdi + 0x00]
    mov rbp, [rdi + 0x08]
    mov r12, [rdi + 0x10]
    mov r13, [rdi + 0x18]
    mov r14, [rdi + 0x20]
    mov r15, [rdi + 0x28]
    mov rsp, [rdi + 0x30]
    mov eax, 1
    jmp qword ptr [rdi + 0x38]

    // Synthetic return target for thread entry functions. An entry function
    // that returns pops this address; the stack parity at that point is not
    // a call-site parity, so realign before entering Rust.
    .globl uthreads_thread_landing
uthreads_thread_landing:
    and rsp, -16
    call uthreads_thread_exit
    ud2
"#
);

/// Builds a context that will begin executing `entry` on the given stack.
///
/// The stack pointer starts at the highest 16-byte-aligned address of the
/// region, minus one word reserved for the synthetic return slot: `entry`
/// observes the ABI parity of a freshly called function, and if it ever
/// returns it lands in `uthreads_thread_landing`, which terminates the
/// thread.
///
/// # Safety
///
/// `stack_base..stack_base + stack_size` must be writable memory owned by
/// the caller and must stay allocated for as long as the returned context
/// (or any execution it starts) is alive.
pub unsafe fn prepare(entry: extern "C" fn(), stack_base: *mut u8, stack_size: usize) -> Context {
    let top = stack_base as usize + stack_size;
    let slot = (top & !0xF) - core::mem::size_of::<u64>();
    (slot as *mut u64).write(uthreads_thread_landing as usize as u64);

    let mut ctx = Context::zeroed();
    ctx.rsp = slot as u64;
    ctx.rip = entry as usize as u64;
    ctx
}

/// Records the current register state into `ctx`.
///
/// Returns [`SavePoint::Saved`] on the way in and [`SavePoint::Resumed`]
/// when a later [`resume`] of `ctx` brings control back here.
///
/// # Safety
///
/// `ctx` must be valid for writes and must not alias memory the compiler
/// believes immutable across the call.
#[inline]
pub unsafe fn save(ctx: *mut Context) -> SavePoint {
    if uthreads_ctx_save(ctx) == 0 {
        SavePoint::Saved
    } else {
        SavePoint::Resumed
    }
}

/// Reinstates `ctx` and never returns; control reappears at the matching
/// [`save`] (or at the entry function of a freshly [`prepare`]d context).
///
/// # Safety
///
/// `ctx` must hold register state produced by [`save`] or [`prepare`] whose
/// stack is still allocated.
#[inline]
pub unsafe fn resume(ctx: *const Context) -> ! {
    uthreads_ctx_resume(ctx)
}
