use core::fmt;
use core::iter::FusedIterator;
use core::ptr;

/// The universal root type. Every exception is an instance of it.
///
/// A catch clause for `EXCEPTION` is a catch-all clause, even for exceptions whose types descend
/// from a different root.
pub static EXCEPTION: ExceptionType = ExceptionType::root("Exception");

/// A node in the exception type hierarchy.
///
/// Types are immutable records linked to their parent. They must be declared as `static` items
/// (see [`declare_exception!`](crate::declare_exception)): identity is the address of the record,
/// not its name, so two types with equal names are still unrelated.
///
/// # Example
///
/// ```rust
/// use helium::{EXCEPTION, ExceptionType};
///
/// static IO_ERROR: ExceptionType = ExceptionType::new("IOError", &EXCEPTION);
/// static DISK_FULL: ExceptionType = ExceptionType::new("DiskFull", &IO_ERROR);
///
/// assert!(DISK_FULL.is_subtype_of(&IO_ERROR));
/// assert!(DISK_FULL.is_subtype_of(&EXCEPTION));
/// assert!(!IO_ERROR.is_subtype_of(&DISK_FULL));
/// ```
pub struct ExceptionType {
    name: &'static str,
    parent: Option<&'static ExceptionType>,
}

impl ExceptionType {
    /// Declare a type deriving from `parent`.
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str, parent: &'static Self) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// Declare a type without a parent.
    ///
    /// Most hierarchies should descend from [`EXCEPTION`] instead.
    #[inline]
    #[must_use]
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// The name the type was declared with.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The immediate parent, if any.
    #[inline]
    #[must_use]
    pub const fn parent(&self) -> Option<&'static Self> {
        self.parent
    }

    /// Walk the parent chain, starting with the immediate parent.
    #[inline]
    pub const fn ancestors(&self) -> Ancestors {
        Ancestors { next: self.parent }
    }

    /// Whether an exception of this type is caught by a clause for `other`.
    ///
    /// This holds if the types are the same, if `other` is [`EXCEPTION`], or if `other` is an
    /// ancestor of this type. The parent chain must not contain cycles.
    #[inline]
    #[must_use]
    pub fn is_subtype_of(&self, other: &Self) -> bool {
        self == other || other == &EXCEPTION || self.ancestors().any(|ancestor| ancestor == other)
    }
}

impl PartialEq for ExceptionType {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for ExceptionType {}

impl fmt::Debug for ExceptionType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionType")
            .field("name", &self.name)
            .field("parent", &self.parent.map(Self::name))
            .finish()
    }
}

impl fmt::Display for ExceptionType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Iterator over the ancestors of an [`ExceptionType`], innermost first.
#[derive(Clone, Debug)]
pub struct Ancestors {
    next: Option<&'static ExceptionType>,
}

impl Iterator for Ancestors {
    type Item = &'static ExceptionType;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent;
        Some(current)
    }
}

impl FusedIterator for Ancestors {}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::vec::Vec;

    static IO_ERROR: ExceptionType = ExceptionType::new("IOError", &EXCEPTION);
    static DISK_FULL: ExceptionType = ExceptionType::new("DiskFull", &IO_ERROR);
    static PARSE_ERROR: ExceptionType = ExceptionType::new("ParseError", &EXCEPTION);
    static FOREIGN: ExceptionType = ExceptionType::root("Foreign");
    static FOREIGN_CHILD: ExceptionType = ExceptionType::new("ForeignChild", &FOREIGN);
    static IO_ERROR_TWIN: ExceptionType = ExceptionType::new("IOError", &EXCEPTION);

    #[test]
    fn ancestors_walk_to_root() {
        let names: Vec<_> = DISK_FULL.ancestors().map(ExceptionType::name).collect();
        assert_eq!(names, ["IOError", "Exception"]);
        assert_eq!(EXCEPTION.ancestors().count(), 0);
    }

    #[test]
    fn subtypes() {
        assert!(DISK_FULL.is_subtype_of(&DISK_FULL));
        assert!(DISK_FULL.is_subtype_of(&IO_ERROR));
        assert!(DISK_FULL.is_subtype_of(&EXCEPTION));
        assert!(!IO_ERROR.is_subtype_of(&DISK_FULL));
        assert!(!DISK_FULL.is_subtype_of(&PARSE_ERROR));
        assert!(!PARSE_ERROR.is_subtype_of(&IO_ERROR));
    }

    #[test]
    fn root_matches_other_roots() {
        assert!(FOREIGN_CHILD.is_subtype_of(&FOREIGN));
        assert!(FOREIGN_CHILD.is_subtype_of(&EXCEPTION));
        assert!(FOREIGN.is_subtype_of(&EXCEPTION));
        assert!(!EXCEPTION.is_subtype_of(&FOREIGN));
    }

    #[test]
    fn identity_is_by_address() {
        assert_eq!(IO_ERROR.name(), IO_ERROR_TWIN.name());
        assert_ne!(IO_ERROR, IO_ERROR_TWIN);
        assert!(!DISK_FULL.is_subtype_of(&IO_ERROR_TWIN));
    }
}
