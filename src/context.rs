use super::exception::Exception;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::mem::ManuallyDrop;

/// The state of a protected region.
///
/// A region starts out [`Trying`](Status::Trying) and never returns to it. The two exception
/// states differ in where the exception came from: [`ExceptionOccurred`](Status::ExceptionOccurred)
/// means the body raised, and the region's catch clauses get to look at it;
/// [`ExceptionDuringDispatch`](Status::ExceptionDuringDispatch) means one of the region's own
/// clauses raised, so the exception must not be offered to the region again and propagates
/// outward once cleanup has run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Status {
    /// The body is running.
    Trying,
    /// The body completed without raising.
    NoException,
    /// The body raised an exception that has not been matched yet.
    ExceptionOccurred,
    /// A catch, no-exception or finally clause of the region raised.
    ExceptionDuringDispatch,
    /// A catch clause matched the exception.
    CaughtException,
    /// An early exit is leaving the region through its cleanup.
    Interrupted,
}

impl Status {
    /// Whether leaving the region in this state re-raises the held exception.
    #[inline]
    #[must_use]
    pub const fn is_exceptional(self) -> bool {
        matches!(self, Self::ExceptionOccurred | Self::ExceptionDuringDispatch)
    }
}

/// Activation record of one protected region.
struct Context {
    status: Status,
    exception: Option<Exception>,
}

/// A thread's protected regions, innermost last.
// Invariant: the code running under an interceptor of the region at depth `n` never observes a
// stack shorter than `n + 1` entries.
pub(crate) struct ContextStack {
    contexts: RefCell<Vec<Context>>,
}

impl ContextStack {
    const fn new() -> Self {
        Self {
            contexts: RefCell::new(Vec::new()),
        }
    }

    fn push(&self) -> usize {
        let mut contexts = self.contexts.borrow_mut();
        contexts.push(Context {
            status: Status::Trying,
            exception: None,
        });
        contexts.len() - 1
    }

    fn pop(&self, depth: usize) -> Context {
        let popped = {
            let mut contexts = self.contexts.borrow_mut();
            if contexts.len() == depth + 1 {
                contexts.pop()
            } else {
                None
            }
        };
        popped.unwrap_or_else(|| crate::abort("helium: protected regions were exited out of order"))
    }

    fn with_context<T>(&self, depth: usize, f: impl FnOnce(&mut Context) -> T) -> T {
        if let Some(context) = self.contexts.borrow_mut().get_mut(depth) {
            return f(context);
        }
        crate::abort("helium: protected region accessed after it was exited");
    }
}

#[cfg(thread_local = "std")]
std::thread_local! {
    /// Thread-local context stack.
    static STACK: ContextStack = const { ContextStack::new() };
}

#[cfg(thread_local = "attribute")]
#[thread_local]
static STACK: ContextStack = ContextStack::new();

/// Run `f` with the thread's context stack.
///
/// `f` must not call back into user code: cleanup callbacks in particular may re-enter the stack,
/// so exceptions are always moved out and dropped after `f` returns.
#[inline]
fn with_stack<T>(f: impl FnOnce(&ContextStack) -> T) -> T {
    #[cfg(thread_local = "std")]
    return STACK.with(f);

    #[cfg(thread_local = "attribute")]
    return f(&STACK);
}

/// Store `exception` in the innermost region and decide which status it arrives with.
///
/// Returns the exception that was superseded, if any, for the caller to drop. If no region is
/// active, the exception is handed back.
pub(crate) fn deliver(exception: Exception) -> Result<(Status, Option<Exception>), Exception> {
    with_stack(|stack| {
        let mut contexts = stack.contexts.borrow_mut();
        let Some(context) = contexts.last_mut() else {
            return Err(exception);
        };
        context.status = if context.status == Status::Trying {
            Status::ExceptionOccurred
        } else {
            Status::ExceptionDuringDispatch
        };
        let superseded = context.exception.replace(exception);
        Ok((context.status, superseded))
    })
}

/// Mark the exception handled by the innermost region as escaping again.
///
/// Only succeeds while a catch clause of the innermost region is running.
pub(crate) fn mark_rethrown() -> Option<Status> {
    with_stack(|stack| {
        let mut contexts = stack.contexts.borrow_mut();
        let context = contexts.last_mut()?;
        // The handled exception is lent to the clause, so the slot is empty exactly while it runs.
        if context.status == Status::CaughtException && context.exception.is_none() {
            context.status = Status::ExceptionDuringDispatch;
            Some(context.status)
        } else {
            None
        }
    })
}

/// Number of protected regions active on this thread.
#[inline]
#[must_use]
pub fn depth() -> usize {
    with_stack(|stack| stack.contexts.borrow().len())
}

/// Status of the innermost protected region on this thread, if any.
///
/// # Example
///
/// ```rust
/// use core::cell::Cell;
/// use helium::{Status, current_status, try_catch};
///
/// assert_eq!(current_status(), None);
/// let seen = Cell::new(None);
/// try_catch! {
///     try { seen.set(current_status()); }
/// }
/// assert_eq!(seen.get(), Some(Status::Trying));
/// ```
#[inline]
#[must_use]
pub fn current_status() -> Option<Status> {
    with_stack(|stack| stack.contexts.borrow().last().map(|context| context.status))
}

/// Registration of a protected region on the context stack.
///
/// Dropping the guard without [`Entered::leave`] only happens when a foreign panic unwinds
/// through the region; the context is popped and its exception released.
pub(crate) struct Entered {
    depth: usize,
}

impl Entered {
    pub fn push() -> Self {
        let depth = with_stack(ContextStack::push);
        tracing::trace!(depth, "entered protected region");
        Self { depth }
    }

    pub fn status(&self) -> Status {
        with_stack(|stack| stack.with_context(self.depth, |context| context.status))
    }

    pub fn set_status(&self, status: Status) {
        with_stack(|stack| stack.with_context(self.depth, |context| context.status = status));
    }

    /// Move the held exception out, leaving the slot empty.
    pub fn take_exception(&self) -> Option<Exception> {
        with_stack(|stack| stack.with_context(self.depth, |context| context.exception.take()))
    }

    /// Put an exception back into the slot. The slot must be empty.
    pub fn restore_exception(&self, exception: Exception) {
        let displaced = with_stack(|stack| {
            stack.with_context(self.depth, |context| context.exception.replace(exception))
        });
        debug_assert!(displaced.is_none(), "restored over a held exception");
        drop(displaced);
    }

    pub fn holds_exception(&self) -> bool {
        with_stack(|stack| stack.with_context(self.depth, |context| context.exception.is_some()))
    }

    /// Pop the context, returning its final status and whatever exception it still holds.
    pub fn leave(self) -> (Status, Option<Exception>) {
        let this = ManuallyDrop::new(self);
        let context = with_stack(|stack| stack.pop(this.depth));
        tracing::trace!(depth = this.depth, status = ?context.status, "left protected region");
        (context.status, context.exception)
    }
}

impl Drop for Entered {
    fn drop(&mut self) {
        let context = with_stack(|stack| stack.pop(self.depth));
        tracing::trace!(depth = self.depth, "protected region unwound by a panic");
        drop(context);
    }
}
