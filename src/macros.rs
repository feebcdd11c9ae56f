/// Declare exception types as `static` items.
///
/// The type's name is the identifier, unless a display name is given after `=`.
///
/// # Example
///
/// ```rust
/// use helium::{EXCEPTION, declare_exception};
///
/// declare_exception! {
///     /// Errors talking to the disk.
///     pub IO_ERROR = "IOError": EXCEPTION;
///     pub DISK_FULL: IO_ERROR;
/// }
///
/// assert_eq!(IO_ERROR.name(), "IOError");
/// assert_eq!(DISK_FULL.name(), "DISK_FULL");
/// assert_eq!(DISK_FULL.parent(), Some(&IO_ERROR));
/// ```
#[macro_export]
macro_rules! declare_exception {
    ($($(#[$attr:meta])* $vis:vis $name:ident $(= $display:literal)? : $parent:path);+ $(;)?) => {
        $(
            $(#[$attr])*
            $vis static $name: $crate::ExceptionType = $crate::ExceptionType::new(
                $crate::__exception_name!($name $(, $display)?),
                &$parent,
            );
        )+
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __exception_name {
    ($name:ident) => {
        ::core::stringify!($name)
    };
    ($name:ident, $display:literal) => {
        $display
    };
}

/// Raise a new exception of the given type, recording the invocation site.
///
/// Takes the type, an optional message and an optional cleanup callback. See [`raise`](fn@crate::raise)
/// and [`Exception`](crate::Exception).
///
/// # Example
///
/// ```rust
/// use helium::{EXCEPTION, catch, raise};
///
/// let err = catch(|| -> () { raise!(EXCEPTION, "disk full") }).unwrap_err();
/// assert_eq!(err.message(), Some("disk full"));
/// ```
#[macro_export]
macro_rules! raise {
    ($kind:path $(,)?) => {
        $crate::raise($crate::Exception::new(&$kind))
    };
    ($kind:path, $message:expr $(,)?) => {
        $crate::raise($crate::Exception::new(&$kind).with_message($message))
    };
    ($kind:path, $message:expr, $cleanup:expr $(,)?) => {
        $crate::raise(
            $crate::Exception::new(&$kind)
                .with_message($message)
                .with_cleanup($cleanup),
        )
    };
}

/// Leave the enclosing [`try_catch!`] clause early.
///
/// Expands to `return ControlFlow::Break(value)`, so it only works lexically inside a clause of a
/// `try_catch!` with an `exit` arm, which receives `value` once the region's `finally` clause has
/// run.
#[macro_export]
macro_rules! leave {
    () => {
        return ::core::ops::ControlFlow::Break(())
    };
    ($exit:expr $(,)?) => {
        return ::core::ops::ControlFlow::Break($exit)
    };
}

/// Run a protected region.
///
/// ```text
/// try_catch! {
///     try { BODY }
///     catch (TYPE, binding) { HANDLER }   // zero or more, tried in order
///     noexcept { ONLY_IF_BODY_DID_NOT_RAISE }
///     finally { ALWAYS }
///     exit pattern => statement,           // only with `leave!`
/// }
/// ```
///
/// The macro evaluates to the value of the body or of the handler that caught the exception.
/// Exceptions no clause catches propagate to the enclosing region after `finally` has run. Each
/// block becomes its own closure, see [`TryCatch`](crate::TryCatch) for what that means for shared
/// state.
///
/// With an `exit` arm, any clause may call [`leave!`] to exit early. The region runs `finally`,
/// unwinds its bookkeeping, and then evaluates the `exit` arm in the caller's frame, where
/// `return`, `break` and `continue` mean what they say. To leave several nested regions at once,
/// write `leave!` in the inner region's `exit` arm.
///
/// # Example
///
/// ```rust
/// use core::cell::Cell;
/// use helium::{EXCEPTION, declare_exception, leave, raise, try_catch};
///
/// declare_exception!(IO_ERROR = "IOError": EXCEPTION);
///
/// let cleanups = Cell::new(0);
/// let message = try_catch! {
///     try { raise!(IO_ERROR, "disk full") }
///     catch (IO_ERROR, e) { e.message().unwrap_or_default().to_owned() }
///     finally { cleanups.set(cleanups.get() + 1) }
/// };
/// assert_eq!(message, "disk full");
/// assert_eq!(cleanups.get(), 1);
///
/// fn first_negative(values: &[i32], cleanups: &Cell<u32>) -> Option<usize> {
///     for (index, &value) in values.iter().enumerate() {
///         try_catch! {
///             try {
///                 if value < 0 {
///                     leave!(index);
///                 }
///             }
///             finally { cleanups.set(cleanups.get() + 1) }
///             exit index => return Some(index),
///         }
///     }
///     None
/// }
///
/// let cleanups = Cell::new(0);
/// assert_eq!(first_negative(&[3, 1, -4, 1], &cleanups), Some(2));
/// assert_eq!(cleanups.get(), 3);
/// ```
///
/// Clauses may end in [`raise!`], [`rethrow`](crate::rethrow) or [`leave!`] without tripping the
/// unreachable-code lint:
///
/// ```rust
/// #![deny(warnings)]
///
/// use helium::{EXCEPTION, declare_exception, leave, raise, rethrow, try_catch};
///
/// declare_exception!(IO_ERROR = "IOError": EXCEPTION);
///
/// fn message() -> String {
///     try_catch! {
///         try { raise!(IO_ERROR, "disk full") }
///         catch (IO_ERROR, e) { e.message().unwrap_or_default().to_owned() }
///     }
/// }
///
/// fn code() -> u32 {
///     let value: u32 = try_catch! {
///         try { raise!(IO_ERROR, "disk full") }
///         catch (IO_ERROR, _) { leave!(2) }
///         exit code => return code,
///     };
///     value
/// }
///
/// fn passed_on() -> helium::Exception {
///     helium::catch(|| -> u32 {
///         try_catch! {
///             try { raise!(IO_ERROR, "again") }
///             catch (IO_ERROR, _) { rethrow() }
///         }
///     })
///     .unwrap_err()
/// }
///
/// fn main() {
///     assert_eq!(message(), "disk full");
///     assert_eq!(code(), 2);
///     assert_eq!(passed_on().message(), Some("again"));
/// }
/// ```
#[macro_export]
macro_rules! try_catch {
    (
        try $body:block
        $(catch ($kind:path, $bind:pat) $handler:block)*
        $(noexcept $no_exception:block)?
        $(finally $finally:block)?
    ) => {
        $crate::TryCatch::<_, ::core::convert::Infallible>::new($crate::__private::proceed(|| $body))
        $(.catch(&$kind, $crate::__private::proceed_with(|$bind: &$crate::Exception| $handler)))*
        $(.no_exception($crate::__private::proceed(|| $no_exception)))?
        $(.finally($crate::__private::proceed(|| $finally)))?
        .value()
    };
    (
        try $body:block
        $(catch ($kind:path, $bind:pat) $handler:block)*
        $(noexcept $no_exception:block)?
        $(finally $finally:block)?
        exit $exit:pat => $on_exit:expr $(,)?
    ) => {
        match $crate::TryCatch::new(|| $crate::__continue!($body))
            $(.catch(&$kind, |$bind: &$crate::Exception| $crate::__continue!($handler)))*
            $(.no_exception(|| $crate::__continue!($no_exception)))?
            $(.finally(|| $crate::__continue!($finally)))?
            .run()
        {
            ::core::ops::ControlFlow::Continue(value) => value,
            ::core::ops::ControlFlow::Break($exit) => $on_exit,
        }
    };
}

// Clauses of a region with an `exit` arm may `return` a `Break` through `leave!`, so the
// `Continue` has to be built in the clause's own closure.
#[doc(hidden)]
#[macro_export]
macro_rules! __continue {
    ($block:block) => {{
        #[allow(unreachable_code)]
        let flow = ::core::ops::ControlFlow::Continue($block);
        flow
    }};
}

#[doc(hidden)]
pub mod __private {
    use crate::exception::Exception;
    use core::ops::ControlFlow;

    // Taking the block as a closure lets a block of type `!` coerce to `R` without an
    // unreachable-call warning at the use site.
    #[inline]
    pub fn proceed<B, R>(block: impl FnOnce() -> R) -> impl FnOnce() -> ControlFlow<B, R> {
        move || ControlFlow::Continue(block())
    }

    #[inline]
    pub fn proceed_with<B, R>(
        handler: impl FnOnce(&Exception) -> R,
    ) -> impl FnOnce(&Exception) -> ControlFlow<B, R> {
        move |exception: &Exception| ControlFlow::Continue(handler(exception))
    }
}
