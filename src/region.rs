use super::{
    api::raise,
    backend::{ActiveBackend, Backend},
    context::{Entered, Status},
    exception::Exception,
    hierarchy::ExceptionType,
};
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ops::ControlFlow;

type Body<'a, B, R> = Box<dyn FnOnce() -> ControlFlow<B, R> + 'a>;
type Handler<'a, B, R> = Box<dyn FnOnce(&Exception) -> ControlFlow<B, R> + 'a>;
type Block<'a, B> = Box<dyn FnOnce() -> ControlFlow<B> + 'a>;

/// A protected region: `try { body } catch ... noexcept { .. } finally { .. }`.
///
/// Every clause returns [`ControlFlow`]. `Continue` is ordinary completion; `Break(exit)` is an
/// early exit (a `return`, `break` or `continue` the caller wants to perform once the region is
/// left). An early exit still runs the `finally` clause before [`TryCatch::run`] hands the exit
/// value back.
///
/// Catch clauses are tried in declaration order and the first one whose type matches wins, even
/// if a later clause names a more specific type. An exception raised from one of the region's own
/// clauses is never offered to the region's catch clauses; it propagates once `finally` has run.
///
/// Clauses are separate closures, so state shared between them (a counter bumped in both the
/// body and `finally`, say) has to live in a [`Cell`](core::cell::Cell) or similar.
///
/// [`try_catch!`](crate::try_catch) is the more convenient way to build a region.
///
/// # Example
///
/// ```rust
/// use core::cell::Cell;
/// use core::convert::Infallible;
/// use core::ops::ControlFlow;
/// use helium::{EXCEPTION, Exception, TryCatch, declare_exception, raise};
///
/// declare_exception!(IO_ERROR = "IOError": EXCEPTION);
///
/// let cleanups = Cell::new(0);
/// let flow: ControlFlow<Infallible, String> =
///     TryCatch::new(|| raise(Exception::new(&IO_ERROR).with_message("disk full")))
///         .catch(&IO_ERROR, |ex| ControlFlow::Continue(format!("handled {}", ex.type_name())))
///         .finally(|| {
///             cleanups.set(cleanups.get() + 1);
///             ControlFlow::Continue(())
///         })
///         .run();
/// assert_eq!(flow, ControlFlow::Continue(String::from("handled IOError")));
/// assert_eq!(cleanups.get(), 1);
/// ```
#[must_use = "a protected region does nothing until `run` is called"]
pub struct TryCatch<'a, R, B> {
    body: Body<'a, B, R>,
    clauses: Vec<(&'static ExceptionType, Handler<'a, B, R>)>,
    no_exception: Option<Block<'a, B>>,
    finally: Option<Block<'a, B>>,
}

impl<'a, R, B> TryCatch<'a, R, B> {
    /// Start a region with the given body.
    #[inline]
    pub fn new(body: impl FnOnce() -> ControlFlow<B, R> + 'a) -> Self {
        Self {
            body: Box::new(body),
            clauses: Vec::new(),
            no_exception: None,
            finally: None,
        }
    }

    /// Add a catch clause for `kind` and its descendants.
    #[inline]
    pub fn catch(
        mut self,
        kind: &'static ExceptionType,
        handler: impl FnOnce(&Exception) -> ControlFlow<B, R> + 'a,
    ) -> Self {
        self.clauses.push((kind, Box::new(handler)));
        self
    }

    /// Set the block that runs only if the body completed without raising.
    ///
    /// It runs before `finally`. Setting it again replaces the previous block.
    #[inline]
    pub fn no_exception(mut self, block: impl FnOnce() -> ControlFlow<B> + 'a) -> Self {
        self.no_exception = Some(Box::new(block));
        self
    }

    /// Set the block that runs exactly once on every way out of the region.
    ///
    /// If it raises, the new exception replaces whatever was in flight. If it exits early, any
    /// exception in flight is discarded. Setting it again replaces the previous block.
    #[inline]
    pub fn finally(mut self, block: impl FnOnce() -> ControlFlow<B> + 'a) -> Self {
        self.finally = Some(Box::new(block));
        self
    }

    /// Run the region.
    ///
    /// Returns the value of the body or of the catch clause that handled the exception, or the
    /// early exit requested by any clause. If an exception is left unhandled, it is raised again in
    /// the enclosing region and this function does not return.
    pub fn run(self) -> ControlFlow<B, R> {
        let Self {
            body,
            clauses,
            no_exception,
            finally,
        } = self;
        let region = Entered::push();

        let mut flow = match ActiveBackend::intercept(body) {
            Ok(flow) => {
                region.set_status(completion_status(&flow, Status::NoException));
                Some(flow)
            }
            Err(_) => None,
        };

        if region.status() == Status::ExceptionOccurred {
            if let Some(handled) = dispatch(&region, clauses) {
                flow = Some(handled);
            }
        }

        if region.status() == Status::NoException {
            if let Some(block) = no_exception {
                match ActiveBackend::intercept(block) {
                    Ok(ControlFlow::Continue(())) => {}
                    Ok(ControlFlow::Break(exit)) => {
                        region.set_status(Status::Interrupted);
                        flow = Some(ControlFlow::Break(exit));
                    }
                    Err(_) => flow = None,
                }
            }
        }

        if let Some(block) = finally {
            match ActiveBackend::intercept(block) {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(exit)) => {
                    // Cleanup already ran, so the exit takes effect right away.
                    let (status, held) = region.leave();
                    tracing::trace!(?status, "early exit from finally clause");
                    drop(held);
                    return ControlFlow::Break(exit);
                }
                Err(_) => flow = None,
            }
        }

        let (status, held) = region.leave();
        if status.is_exceptional() {
            if let Some(exception) = held {
                tracing::trace!(%exception, "exception not handled, propagating outward");
                raise(exception);
            }
        }
        drop(held);

        flow.unwrap_or_else(|| crate::abort("helium: protected region finished without a result"))
    }
}

impl<R> TryCatch<'_, R, core::convert::Infallible> {
    /// Run a region that cannot exit early, returning its value directly.
    #[inline]
    pub fn value(self) -> R {
        match self.run() {
            ControlFlow::Continue(value) => value,
            ControlFlow::Break(never) => match never {},
        }
    }
}

/// Status a clause's result leaves the region in.
fn completion_status<B, C>(flow: &ControlFlow<B, C>, on_continue: Status) -> Status {
    match flow {
        ControlFlow::Continue(_) => on_continue,
        ControlFlow::Break(_) => Status::Interrupted,
    }
}

/// Offer the held exception to the catch clauses, in declaration order.
///
/// Returns the result of the clause that handled it, if one matched and completed.
fn dispatch<B, R>(
    region: &Entered,
    clauses: Vec<(&'static ExceptionType, Handler<'_, B, R>)>,
) -> Option<ControlFlow<B, R>> {
    let exception = region.take_exception()?;
    let Some((kind, handler)) = clauses
        .into_iter()
        .find(|(kind, _)| exception.is_instance_of(kind))
    else {
        region.restore_exception(exception);
        return None;
    };

    tracing::trace!(%exception, clause = kind.name(), "catch clause selected");
    region.set_status(Status::CaughtException);
    // The clause borrows the exception while the slot stays empty, so a raise from inside the
    // clause can't drop it from under the clause.
    match ActiveBackend::intercept(|| handler(&exception)) {
        Ok(handled) => {
            region.set_status(completion_status(&handled, Status::CaughtException));
            region.restore_exception(exception);
            Some(handled)
        }
        Err(_) if region.holds_exception() => {
            // Superseded by a new raise from the clause.
            drop(exception);
            None
        }
        Err(_) => {
            // `rethrow`: the same exception keeps propagating.
            region.restore_exception(exception);
            None
        }
    }
}
