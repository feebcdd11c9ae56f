//! Structured exceptions.
//!
//! Helium provides `try`/`catch`/`finally` regions with a typed exception hierarchy. An exception
//! raised anywhere below a region unwinds straight to it, the first matching catch clause handles
//! it, and the region's `finally` clause runs exactly once no matter how the region is left: by
//! completing, by handling an exception, by letting one propagate, or by an early exit.
//!
//!
//! # Usage
//!
//! Declare exception types with [`declare_exception!`]. Every type has a parent, ending in the
//! root type [`EXCEPTION`], and a catch clause for a type also catches all of its descendants.
//!
//! Raise an exception with [`raise!`] or [`raise`](fn@raise) and handle it with [`try_catch!`], the
//! [`TryCatch`] builder, or the plain [`catch`] function:
//!
//! ```rust
//! use core::cell::Cell;
//! use helium::{EXCEPTION, declare_exception, raise, try_catch};
//!
//! declare_exception! {
//!     pub IO_ERROR = "IOError": EXCEPTION;
//!     pub DISK_FULL = "DiskFull": IO_ERROR;
//! }
//!
//! fn save(free: u64) -> u64 {
//!     if free == 0 {
//!         raise!(DISK_FULL, "no space left");
//!     }
//!     free - 1
//! }
//!
//! let closed = Cell::new(false);
//! let left = try_catch! {
//!     try { save(0) }
//!     catch (IO_ERROR, e) {
//!         assert_eq!(e.type_name(), "DiskFull");
//!         0
//!     }
//!     finally { closed.set(true) }
//! };
//! assert_eq!(left, 0);
//! assert!(closed.get());
//! ```
//!
//! Exceptions that no region catches are passed to the thread's
//! [uncaught handler](set_uncaught_handler), which by default prints them and aborts.
//!
//!
//! # Interaction with panics
//!
//! Exceptions are implemented on top of Rust unwinding, so the crate requires `panic = "unwind"`.
//! Rust panics are never caught by a region: they pass through untouched, taking the region's
//! bookkeeping with them, but do not run `finally` clauses. Do not raise across
//! [`std::panic::catch_unwind`] or a thread boundary.
//!
//! Because a raise is an unwind, code that inspects unwinding sees it as a panic while the
//! exception travels: [`std::thread::panicking`] returns `true` in destructors that run on the way,
//! and a [`std::sync::Mutex`] or [`std::sync::RwLock`] guard held across a raise poisons its lock,
//! even if a region catches the exception. Release such guards before raising.
//!
//! Exceptions are thread-local. Each thread has its own stack of active regions and its own
//! uncaught handler. [`Exception`] is neither [`Send`] nor [`Sync`].
//!
//!
//! # Configuration
//!
//! Two build-time settings are read from the environment by the build script:
//!
//! - `HELIUM_SOURCE_INFO`: `full` (the default) records the raise site's file and line, `file` only
//!   records the file, `none` records neither.
//! - `HELIUM_THREAD_LOCAL`: `std` uses [`std::thread_local!`], `attribute` uses the faster
//!   `#[thread_local]` statics. The latter is picked automatically on nightly.
//!
//!
//! # Logging
//!
//! Region entry and exit, raises, and clause selection are reported as [`tracing`] events at the
//! `trace` level. Uncaught exceptions are reported at the `debug` level before the handler runs.

#![cfg_attr(thread_local = "attribute", feature(thread_local))]
#![forbid(unsafe_code)]
#![warn(
    clippy::cargo,
    clippy::pedantic,
    clippy::missing_const_for_fn,
    clippy::alloc_instead_of_core,
    clippy::allow_attributes,
    clippy::arithmetic_side_effects,
    clippy::as_underscore,
    clippy::assertions_on_result_states,
    clippy::clone_on_ref_ptr,
    clippy::decimal_literal_representation,
    clippy::default_numeric_fallback,
    clippy::deref_by_slicing,
    clippy::else_if_without_else,
    clippy::empty_drop,
    clippy::empty_enum_variants_with_brackets,
    clippy::empty_structs_with_brackets,
    clippy::exhaustive_enums,
    clippy::exhaustive_structs,
    clippy::fn_to_numeric_cast_any,
    clippy::format_push_string,
    clippy::infinite_loop,
    clippy::mem_forget, // use ManuallyDrop instead
    clippy::missing_assert_message,
    clippy::missing_inline_in_public_items,
    clippy::mixed_read_write_in_expression,
    clippy::mutex_atomic,
    clippy::needless_raw_strings,
    clippy::pub_without_shorthand,
    clippy::rc_buffer,
    clippy::rc_mutex,
    clippy::redundant_type_annotations,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::same_name_method,
    clippy::self_named_module_files,
    clippy::semicolon_inside_block,
    clippy::separated_literal_suffix,
    clippy::shadow_unrelated,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::string_lit_chars_any,
    clippy::string_to_string,
    clippy::tests_outside_test_module,
    clippy::try_err,
    clippy::unnecessary_self_imports,
    clippy::unneeded_field_pattern,
    clippy::unused_result_ok,
    clippy::wildcard_enum_match_arm,
)]

extern crate alloc;

mod api;
mod backend;
mod context;
mod exception;
mod hierarchy;
mod macros;
mod region;
mod uncaught;

#[doc(hidden)]
pub use macros::__private;

pub use api::{catch, raise, rethrow};
pub use context::{Status, current_status, depth};
pub use exception::Exception;
pub use hierarchy::{Ancestors, EXCEPTION, ExceptionType};
pub use region::TryCatch;
pub use uncaught::{
    UncaughtHandler, default_uncaught_handler, set_uncaught_handler, uncaught_handler,
};

/// Report a broken invariant of the region bookkeeping and abort.
///
/// Unwinding from here would run more region code on top of the inconsistent state.
#[cold]
pub(crate) fn abort(message: &str) -> ! {
    use std::io::Write;

    tracing::error!(reason = message, "aborting");
    let _ = writeln!(std::io::stderr().lock(), "{message}");
    std::process::abort();
}
