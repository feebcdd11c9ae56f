use crate::context::Status;

/// An unwinding backend.
///
/// Unwinding is a mechanism of forcefully "returning" through multiple call frames, called
/// *throwing*, up until a special call frame, called *interceptor*. This is what lets a raise deep
/// in the call graph land at the protected region that is currently innermost.
///
/// It's crucial that unwinding doesn't require (source-level) cooperation from the intermediate
/// call frames.
///
/// Backends do not carry exception objects. The exception itself is stored in the thread-local
/// context stack before throwing; the backend only transports the [`Status`] the receiving region
/// should observe.
///
/// Implementations must ensure that a thrown status reaches the closest (most nested) `intercept`
/// frame, that all destructors of locals in between are run, and that unwinding which did not
/// originate from `throw` (such as a Rust panic) passes through `intercept` untouched.
pub(crate) trait Backend {
    /// Unwind to the closest interceptor.
    fn throw(status: Status) -> !;

    /// Run `func`, returning `Err` with the thrown status if it throws.
    ///
    /// Unwinding that was not started by [`Backend::throw`] is propagated as-is.
    fn intercept<Func: FnOnce() -> R, R>(func: Func) -> Result<R, Status>;
}

mod panic;

pub(crate) use panic::ActiveBackend;

#[cfg(test)]
mod test {
    use super::*;
    use alloc::boxed::Box;
    use alloc::string::String;

    #[test]
    fn intercept_ok() {
        let result = ActiveBackend::intercept(|| String::from("Hello, world!"));
        assert_eq!(result.unwrap(), "Hello, world!");
    }

    #[test]
    fn intercept_err() {
        let result = ActiveBackend::intercept(|| ActiveBackend::throw(Status::ExceptionOccurred));
        assert_eq!(result.unwrap_err(), Status::ExceptionOccurred);
    }

    #[test]
    fn intercept_panic() {
        let result = std::panic::catch_unwind(|| {
            ActiveBackend::intercept(|| std::panic::resume_unwind(Box::new("Hello, world!")))
                .unwrap()
        });
        assert_eq!(
            *result.unwrap_err().downcast_ref::<&'static str>().unwrap(),
            "Hello, world!",
        );
    }

    #[test]
    fn nested_intercept() {
        let result = ActiveBackend::intercept(|| {
            ActiveBackend::intercept(|| ActiveBackend::throw(Status::ExceptionDuringDispatch))
        });
        assert_eq!(result.unwrap().unwrap_err(), Status::ExceptionDuringDispatch);
    }

    #[test]
    fn rethrow_from_interceptor() {
        let result = ActiveBackend::intercept(|| {
            let status = ActiveBackend::intercept(|| ActiveBackend::throw(Status::ExceptionOccurred))
                .unwrap_err();
            ActiveBackend::throw(status);
        });
        assert_eq!(result.unwrap_err(), Status::ExceptionOccurred);
    }

    #[test]
    fn destructors_are_run() {
        struct Dropper<'a>(&'a mut bool);
        impl Drop for Dropper<'_> {
            fn drop(&mut self) {
                *self.0 = true;
            }
        }

        let mut destructor_was_run = false;
        let result = ActiveBackend::intercept(|| {
            let _dropper = Dropper(&mut destructor_was_run);
            ActiveBackend::throw(Status::ExceptionOccurred);
        });
        assert!(result.is_err());
        assert!(destructor_was_run);
    }

    #[test]
    fn nested_with_drop() {
        struct Dropper;
        impl Drop for Dropper {
            fn drop(&mut self) {
                let result =
                    ActiveBackend::intercept(|| ActiveBackend::throw(Status::ExceptionOccurred));
                assert_eq!(result.unwrap_err(), Status::ExceptionOccurred);
            }
        }

        let result = ActiveBackend::intercept(|| {
            let _dropper = Dropper;
            ActiveBackend::throw(Status::ExceptionDuringDispatch);
        });
        assert_eq!(result.unwrap_err(), Status::ExceptionDuringDispatch);
    }
}
