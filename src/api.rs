use super::{
    backend::{ActiveBackend, Backend},
    context::{Entered, deliver, mark_rethrown},
    exception::Exception,
    uncaught::uncaught_handler,
};

/// Raise an exception.
///
/// Control transfers to the innermost active protected region on this thread, unwinding all frames
/// in between. If that region is already dispatching an exception (the raise comes from one of its
/// own catch, no-exception or finally clauses), the new exception replaces the old one, whose
/// cleanup runs, and propagates past the region once its cleanup is done.
///
/// With no active region, the thread's [uncaught handler](crate::set_uncaught_handler) is invoked.
/// The default handler prints the exception and aborts.
///
/// The frames between the raise and the region must not intercept unwinding on their own: do not
/// raise through [`std::panic::catch_unwind`] or across a thread boundary.
///
/// # Example
///
/// ```rust
/// use helium::{EXCEPTION, Exception, catch, raise};
///
/// let caught = catch(|| -> i32 { raise(Exception::new(&EXCEPTION).with_message("Oops!")) })
///     .unwrap_err();
/// assert_eq!(caught.message(), Some("Oops!"));
/// ```
#[inline]
pub fn raise(exception: Exception) -> ! {
    tracing::trace!(%exception, "raising exception");
    match deliver(exception) {
        Ok((status, superseded)) => {
            drop(superseded);
            ActiveBackend::throw(status);
        }
        Err(exception) => {
            tracing::debug!(%exception, "no protected region is active, exception is uncaught");
            uncaught_handler()(&exception)
        }
    }
}

/// Re-raise the exception being handled, unchanged.
///
/// May only be called from a catch clause, outside of any region nested inside the clause. The
/// region runs its finally clause and then passes the same exception instance outward.
///
/// # Example
///
/// ```rust
/// use helium::{EXCEPTION, catch, raise, rethrow, try_catch};
///
/// let outer = catch(|| -> u32 {
///     try_catch! {
///         try { helium::raise!(EXCEPTION, "first") }
///         catch (EXCEPTION, _) { rethrow() }
///     }
/// });
/// assert_eq!(outer.unwrap_err().message(), Some("first"));
/// ```
#[inline]
pub fn rethrow() -> ! {
    match mark_rethrown() {
        Some(status) => {
            tracing::trace!("rethrowing exception");
            ActiveBackend::throw(status)
        }
        None => crate::abort("helium: rethrow() called outside of a catch clause"),
    }
}

/// Catch any exception.
///
/// If `func` returns a value, this function wraps it in [`Ok`].
///
/// If `func` raises, the exception is returned in [`Err`]. Ownership passes to the caller, so its
/// cleanup callback runs whenever the caller drops it.
///
/// Rust panics are propagated as-is and not caught.
///
/// The cleanup callback of an [`Exception`] may hold thread-local state, so the exception is
/// neither [`Send`] nor [`Sync`]. It converts into a `Box<dyn Error>`, but not into
/// `anyhow::Error` or `Box<dyn Error + Send + Sync>`. To pass it on to such code, report it as a
/// message:
///
/// ```rust
/// use helium::{EXCEPTION, catch};
///
/// let err = catch(|| -> u32 { helium::raise!(EXCEPTION, "disk full") }).unwrap_err();
/// let report = anyhow::anyhow!("{err}");
/// assert!(report.to_string().ends_with(": disk full"));
/// ```
///
/// ```compile_fail
/// use helium::{EXCEPTION, catch};
///
/// let err = catch(|| -> u32 { helium::raise!(EXCEPTION, "disk full") }).unwrap_err();
/// let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
/// ```
///
/// # Example
///
/// ```rust
/// use helium::{EXCEPTION, catch, declare_exception, raise};
///
/// declare_exception!(IO_ERROR = "IOError": EXCEPTION);
///
/// assert_eq!(catch(|| 5).unwrap(), 5);
///
/// let err = catch(|| -> i32 { helium::raise!(IO_ERROR, "disk full") }).unwrap_err();
/// assert!(err.is_instance_of(&IO_ERROR));
/// ```
#[inline]
pub fn catch<R>(func: impl FnOnce() -> R) -> Result<R, Exception> {
    let region = Entered::push();
    let result = ActiveBackend::intercept(func);
    let (_, held) = region.leave();
    match (result, held) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(exception)) => Err(exception),
        (Err(_), None) => crate::abort("helium: region unwound without an exception"),
    }
}
