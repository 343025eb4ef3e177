use core::ops::Range;

/// The kind of JSON value a [`Token`] spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    /// An unused slot, or the kind reported for an index that does not exist.
    #[default]
    Undefined,
    /// `{ ... }`
    Object,
    /// `[ ... ]`
    Array,
    /// `"..."`; the span excludes the quotes and escapes are left as-is.
    String,
    /// A number, `true`, `false` or `null` (or, outside strict mode, any
    /// other bare word).
    Primitive,
}

impl TokenKind {
    /// Returns `true` for [`Object`](Self::Object) and [`Array`](Self::Array).
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }

    /// Returns `true` for [`String`](Self::String) and
    /// [`Primitive`](Self::Primitive).
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        matches!(self, Self::String | Self::Primitive)
    }
}

/// A typed span over the request buffer, linked to its parent by index.
///
/// Object members are stored as a key token (a child of the object) whose
/// only child is the value:
///
/// ```text
/// {"a": [1, 2]}
/// 0 Object     parent -    children 1
/// 1 String a   parent 0    children 1
/// 2 Array      parent 1    children 2
/// 3 Primitive  parent 2    children 0
/// 4 Primitive  parent 2    children 0
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) start: usize,
    pub(crate) end: Option<usize>,
    pub(crate) children: usize,
    pub(crate) parent: Option<usize>,
}

impl Token {
    pub(crate) const fn open(kind: TokenKind, start: usize, parent: Option<usize>) -> Self {
        Self {
            kind,
            start,
            end: None,
            children: 0,
            parent,
        }
    }

    pub(crate) fn closed(
        kind: TokenKind,
        span: Range<usize>,
        parent: Option<usize>,
    ) -> Self {
        Self {
            kind,
            start: span.start,
            end: Some(span.end),
            children: 0,
            parent,
        }
    }

    /// The kind of value this token spans.
    #[must_use]
    pub const fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Byte offset of the first byte of the token.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Byte offset one past the last byte, or `None` while a container is
    /// still open.
    #[must_use]
    pub const fn end(&self) -> Option<usize> {
        self.end
    }

    /// The byte range of a complete token.
    #[must_use]
    pub fn span(&self) -> Option<Range<usize>> {
        self.end.map(|end| self.start..end)
    }

    /// Number of direct children: elements of an array, keys of an object,
    /// and `1` for a key that has its value.
    #[must_use]
    pub const fn child_count(&self) -> usize {
        self.children
    }

    /// Index of the enclosing token, `None` for a root.
    #[must_use]
    pub const fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Whether the closing delimiter of this token has been seen.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.end.is_some()
    }
}
