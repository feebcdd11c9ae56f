use super::hierarchy::ExceptionType;
use alloc::borrow::Cow;
use alloc::boxed::Box;
use core::fmt;
use core::panic::Location;

type Cleanup = Box<dyn FnOnce(Option<&str>)>;

/// One raised exception.
///
/// An exception is created at the raise site, usually by [`raise!`](crate::raise!), and then owned
/// by whichever protected region currently holds it. The optional cleanup callback runs exactly
/// once, when the exception is dropped: after it has been handled, when a newer exception raised
/// in the same region replaces it, or when it is discarded by an early exit.
///
/// The raise site is captured automatically, subject to the `source_info` build configuration.
///
/// # Example
///
/// ```rust
/// use helium::{EXCEPTION, Exception};
///
/// let exception = Exception::new(&EXCEPTION)
///     .with_message("disk full")
///     .with_location("storage.rs", Some(42));
/// assert_eq!(
///     exception.to_string(),
///     "Exception (file \"storage.rs\", line 42): disk full",
/// );
/// ```
pub struct Exception {
    kind: &'static ExceptionType,
    message: Option<Cow<'static, str>>,
    cleanup: Option<Cleanup>,
    file: Option<&'static str>,
    line: Option<u32>,
}

impl Exception {
    /// Create an exception of type `kind`, recording the caller's location.
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn new(kind: &'static ExceptionType) -> Self {
        let caller = Location::caller();
        Self {
            kind,
            message: None,
            cleanup: None,
            file: source_file(caller),
            line: source_line(caller),
        }
    }

    /// Attach a message.
    #[inline]
    #[must_use]
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a callback to run when the exception is discarded.
    ///
    /// The callback receives the message. It must not raise.
    #[inline]
    #[must_use]
    pub fn with_cleanup(mut self, cleanup: impl FnOnce(Option<&str>) + 'static) -> Self {
        self.cleanup = Some(Box::new(cleanup));
        self
    }

    /// Override the recorded origin.
    #[inline]
    #[must_use]
    pub fn with_location(mut self, file: &'static str, line: Option<u32>) -> Self {
        self.file = Some(file);
        self.line = line;
        self
    }

    /// Forget the recorded origin.
    #[inline]
    #[must_use]
    pub fn without_location(mut self) -> Self {
        self.file = None;
        self.line = None;
        self
    }

    /// The type the exception was raised with.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static ExceptionType {
        self.kind
    }

    /// Shorthand for `self.kind().name()`.
    #[inline]
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.kind.name()
    }

    #[inline]
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[inline]
    #[must_use]
    pub const fn file(&self) -> Option<&'static str> {
        self.file
    }

    #[inline]
    #[must_use]
    pub const fn line(&self) -> Option<u32> {
        self.line
    }

    /// Whether a catch clause for `kind` would catch this exception.
    ///
    /// See [`ExceptionType::is_subtype_of`].
    #[inline]
    #[must_use]
    pub fn is_instance_of(&self, kind: &ExceptionType) -> bool {
        self.kind.is_subtype_of(kind)
    }

    /// Write the formatted exception and a trailing newline to `sink`.
    ///
    /// # Errors
    ///
    /// Forwards errors from `sink`.
    #[inline]
    pub fn print(&self, sink: &mut impl std::io::Write) -> std::io::Result<()> {
        writeln!(sink, "{self}")
    }
}

impl Drop for Exception {
    #[inline]
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup(self.message.as_deref());
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())?;
        match (self.file, self.line) {
            (None, _) => f.write_str(" (unknown source)")?,
            (Some(file), None) => write!(f, " (file \"{file}\")")?,
            (Some(file), Some(line)) => write!(f, " (file \"{file}\", line {line})")?,
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exception")
            .field("kind", &self.kind.name())
            .field("message", &self.message)
            .field("file", &self.file)
            .field("line", &self.line)
            .field("has_cleanup", &self.cleanup.is_some())
            .finish()
    }
}

impl std::error::Error for Exception {}

#[cfg(source_info = "none")]
fn source_file(_caller: &'static Location<'static>) -> Option<&'static str> {
    None
}

#[cfg(not(source_info = "none"))]
fn source_file(caller: &'static Location<'static>) -> Option<&'static str> {
    Some(caller.file())
}

#[cfg(source_info = "full")]
fn source_line(caller: &'static Location<'static>) -> Option<u32> {
    Some(caller.line())
}

#[cfg(not(source_info = "full"))]
fn source_line(_caller: &'static Location<'static>) -> Option<u32> {
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hierarchy::EXCEPTION;
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    static IO_ERROR: ExceptionType = ExceptionType::new("IOError", &EXCEPTION);

    #[test]
    fn format_with_full_location() {
        let ex = Exception::new(&IO_ERROR)
            .with_message("disk full")
            .with_location("src/disk.rs", Some(17));
        assert_eq!(ex.to_string(), "IOError (file \"src/disk.rs\", line 17): disk full");
    }

    #[test]
    fn format_omits_missing_parts() {
        let ex = Exception::new(&IO_ERROR).with_location("src/disk.rs", None);
        assert_eq!(ex.to_string(), "IOError (file \"src/disk.rs\")");

        let ex = Exception::new(&IO_ERROR).without_location();
        assert_eq!(ex.to_string(), "IOError (unknown source)");

        let ex = Exception::new(&IO_ERROR)
            .without_location()
            .with_message("oops");
        assert_eq!(ex.to_string(), "IOError (unknown source): oops");
    }

    #[test]
    fn print_appends_newline() {
        let ex = Exception::new(&IO_ERROR)
            .with_message("disk full")
            .with_location("a.rs", Some(3));
        let mut sink = Vec::new();
        ex.print(&mut sink).unwrap();
        assert_eq!(sink, b"IOError (file \"a.rs\", line 3): disk full\n");
    }

    #[cfg(source_info = "full")]
    #[test]
    fn records_caller() {
        let line = line!() + 1;
        let ex = Exception::new(&IO_ERROR);
        assert_eq!(ex.file(), Some(file!()));
        assert_eq!(ex.line(), Some(line));
    }

    #[test]
    fn cleanup_runs_once_on_drop() {
        let seen = Rc::new(RefCell::new(Vec::<Option<String>>::new()));
        let ex = Exception::new(&IO_ERROR).with_message("bye").with_cleanup({
            let seen = Rc::clone(&seen);
            move |message| seen.borrow_mut().push(message.map(String::from))
        });
        assert!(seen.borrow().is_empty());
        drop(ex);
        assert_eq!(*seen.borrow(), [Some(String::from("bye"))]);
    }

    #[test]
    fn instance_of() {
        let ex = Exception::new(&IO_ERROR);
        assert!(ex.is_instance_of(&IO_ERROR));
        assert!(ex.is_instance_of(&EXCEPTION));
        assert_eq!(ex.kind(), &IO_ERROR);
        assert_eq!(ex.type_name(), "IOError");
    }
}
