//! Machine context save and restore
//!
//! The single architecture-specific primitive in the library, isolated
//! behind a three-call contract:
//!
//! - [`prepare`] builds a context that will begin executing an entry
//!   function at the top of a caller-provided stack,
//! - [`save`] records the current register state and reports whether it
//!   just saved or was just resumed,
//! - [`resume`] never returns; control reappears at the matching [`save`]
//!   with [`SavePoint::Resumed`].
//!
//! Everything above this module is portable.

#[cfg(not(all(target_arch = "x86_64", target_os = "linux")))]
compile_error!("uthreads only supports x86_64 Linux");

#[cfg(target_arch = "x86_64")]
mod x86_64;

#[cfg(target_arch = "x86_64")]
pub(crate) use x86_64::{prepare, resume, save, Context, SavePoint};
