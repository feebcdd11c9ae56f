use super::exception::Exception;
use core::cell::Cell;

/// Terminal policy for exceptions raised outside of any protected region.
///
/// The return type guarantees the handler never returns to the raise site. It may terminate the
/// process or thread, or unwind with a Rust panic.
pub type UncaughtHandler = fn(&Exception) -> !;

#[cfg(thread_local = "std")]
std::thread_local! {
    /// Thread-local uncaught-exception handler.
    static HANDLER: Cell<UncaughtHandler> = const { Cell::new(default_uncaught_handler as UncaughtHandler) };
}

#[cfg(thread_local = "attribute")]
#[thread_local]
static HANDLER: Cell<UncaughtHandler> = Cell::new(default_uncaught_handler as UncaughtHandler);

/// The uncaught-exception handler of the current thread.
#[inline]
#[must_use]
pub fn uncaught_handler() -> UncaughtHandler {
    HANDLER.get()
}

/// Install an uncaught-exception handler for the current thread, returning the previous one.
///
/// Each thread starts out with [`default_uncaught_handler`].
///
/// # Example
///
/// ```rust
/// use helium::{Exception, raise, set_uncaught_handler, uncaught_handler};
///
/// fn unwind(exception: &Exception) -> ! {
///     std::panic::resume_unwind(Box::new(exception.to_string()))
/// }
///
/// let previous = set_uncaught_handler(unwind);
/// let payload = std::panic::catch_unwind(|| {
///     raise(Exception::new(&helium::EXCEPTION));
/// })
/// .unwrap_err();
/// assert!(payload.downcast_ref::<String>().unwrap().starts_with("Exception"));
/// set_uncaught_handler(previous);
/// ```
#[inline]
pub fn set_uncaught_handler(handler: UncaughtHandler) -> UncaughtHandler {
    HANDLER.replace(handler)
}

/// Print the exception to stderr and abort the process.
pub fn default_uncaught_handler(exception: &Exception) -> ! {
    let mut stderr = std::io::stderr().lock();
    // Abort regardless: there is nobody left to report a failed write to.
    let _ = exception.print(&mut stderr);
    drop(stderr);
    std::process::abort();
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hierarchy::{EXCEPTION, ExceptionType};
    use alloc::boxed::Box;
    use alloc::string::String;
    use std::panic::AssertUnwindSafe;

    static IO_ERROR: ExceptionType = ExceptionType::new("IOError", &EXCEPTION);

    fn unwinding(exception: &Exception) -> ! {
        std::panic::resume_unwind(Box::new(exception.to_string()))
    }

    #[test]
    fn default_is_installed() {
        assert!(core::ptr::fn_addr_eq(
            uncaught_handler(),
            default_uncaught_handler as UncaughtHandler,
        ));
    }

    #[test]
    fn replace_returns_previous() {
        let previous = set_uncaught_handler(unwinding);
        assert!(core::ptr::fn_addr_eq(previous, default_uncaught_handler as UncaughtHandler));
        assert!(core::ptr::fn_addr_eq(uncaught_handler(), unwinding as UncaughtHandler));

        let ex = Exception::new(&IO_ERROR)
            .with_message("disk full")
            .without_location();
        let payload =
            std::panic::catch_unwind(AssertUnwindSafe(|| {
                uncaught_handler()(&ex);
            }))
            .unwrap_err();
        assert_eq!(
            payload.downcast_ref::<String>().map(String::as_str),
            Some("IOError (unknown source): disk full"),
        );

        set_uncaught_handler(previous);
    }

    #[test]
    fn handlers_are_per_thread() {
        set_uncaught_handler(unwinding);
        let other = std::thread::spawn(|| {
            core::ptr::fn_addr_eq(uncaught_handler(), default_uncaught_handler as UncaughtHandler)
        });
        assert!(other.join().unwrap());
    }

    const ABORT_CHILD: &str = "HELIUM_TEST_DEFAULT_HANDLER_CHILD";

    #[test]
    fn default_handler_prints_and_aborts() {
        if std::env::var_os(ABORT_CHILD).is_some() {
            default_uncaught_handler(
                &Exception::new(&IO_ERROR)
                    .with_message("disk full")
                    .without_location(),
            );
        }

        let output = std::process::Command::new(std::env::current_exe().unwrap())
            .args([
                "--exact",
                "uncaught::test::default_handler_prints_and_aborts",
                "--nocapture",
                "--test-threads=1",
            ])
            .env(ABORT_CHILD, "1")
            .output()
            .unwrap();
        assert!(!output.status.success(), "child exited with {}", output.status);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("IOError (unknown source): disk full\n"),
            "unexpected stderr: {stderr}",
        );

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            // SIGABRT
            assert_eq!(output.status.signal(), Some(6), "child exited with {}", output.status);
        }
    }
}
