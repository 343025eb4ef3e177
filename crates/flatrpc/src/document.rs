//! Read-only navigation over a tokenized document.
//!
//! Lookups only ever scan the direct children of a token. Because tokens are
//! stored in pre-order, the children of token `i` are found by walking
//! forward from `i + 1` and keeping those whose parent is `i`; the walk stops
//! as soon as `child_count` of them have been seen.

use core::iter::FusedIterator;

use bstr::{BStr, ByteSlice};

use crate::{
    numbers::parse_int,
    token::{Token, TokenKind},
};

/// A request buffer paired with the tokens produced from it.
///
/// ```rust
/// use flatrpc::{Document, Selector, Token, Tokenizer};
///
/// let json = br#"{"params": [10, "x"], "id": 1}"#;
/// let mut tokens = [Token::default(); 8];
/// let count = Tokenizer::default().parse(json, &mut tokens)?;
/// let doc = Document::new(json, &tokens[..count]);
///
/// let params = doc.member(0, "params").unwrap();
/// assert_eq!(doc.element(params, 0).and_then(|t| doc.as_i64(t)), Some(10));
/// assert_eq!(doc.get(params, Selector::Index(1)).and_then(|t| doc.as_str(t)), Some("x"));
/// # Ok::<(), flatrpc::TokenizeError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Document<'a> {
    json: &'a [u8],
    tokens: &'a [Token],
}

/// How [`Document::get`] resolves a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'k> {
    /// The value of the first key of an object equal to this one.
    Key(&'k str),
    /// The element at this zero-based position of an array.
    Index(usize),
    /// The token itself, or the value of a key.
    Value,
}

impl<'a> Document<'a> {
    /// Pairs `json` with the tokens produced from it.
    #[must_use]
    pub const fn new(json: &'a [u8], tokens: &'a [Token]) -> Self {
        Self { json, tokens }
    }

    /// The tokens of this document.
    #[must_use]
    pub const fn tokens(&self) -> &'a [Token] {
        self.tokens
    }

    /// The bytes the tokens point into.
    #[must_use]
    pub const fn source(&self) -> &'a [u8] {
        self.json
    }

    /// Number of tokens.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the document has no tokens.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The token at `index`.
    #[must_use]
    pub fn token(&self, index: usize) -> Option<&'a Token> {
        self.tokens.get(index)
    }

    /// The kind of the token at `index`, [`TokenKind::Undefined`] if there is
    /// none.
    #[must_use]
    pub fn kind(&self, index: usize) -> TokenKind {
        self.token(index).map_or(TokenKind::Undefined, Token::kind)
    }

    /// Iterates over the indices of the direct children of `index`.
    ///
    /// For an object these are its keys; for a key, its value.
    #[must_use]
    pub fn children(&self, index: usize) -> Children<'a> {
        Children {
            tokens: self.tokens,
            parent: index,
            next: index.saturating_add(1),
            remaining: self.token(index).map_or(0, Token::child_count),
        }
    }

    /// The first key of the object at `index` equal to `name`.
    #[must_use]
    pub fn key(&self, index: usize, name: &str) -> Option<usize> {
        if self.kind(index) != TokenKind::Object {
            return None;
        }
        self.children(index)
            .find(|&key| self.kind(key) == TokenKind::String && self.eq_str(key, name))
    }

    /// The value of the first key of the object at `index` equal to `name`.
    ///
    /// A key without a value resolves to `None`.
    #[must_use]
    pub fn member(&self, index: usize, name: &str) -> Option<usize> {
        let key = self.key(index, name)?;
        self.children(key).next()
    }

    /// The element at zero-based position `n` of the array at `index`.
    #[must_use]
    pub fn element(&self, index: usize, n: usize) -> Option<usize> {
        if self.kind(index) != TokenKind::Array {
            return None;
        }
        self.children(index).nth(n)
    }

    /// The `n`-th key of the object at `index` and the key's value.
    #[must_use]
    pub fn entry(&self, index: usize, n: usize) -> Option<(usize, Option<usize>)> {
        if self.kind(index) != TokenKind::Object {
            return None;
        }
        let key = self.children(index).nth(n)?;
        Some((key, self.children(key).next()))
    }

    /// Unwraps a key to its value; any other token resolves to itself.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<usize> {
        let token = self.token(index)?;
        if token.kind().is_scalar()
            && self
                .token(index + 1)
                .is_some_and(|child| child.parent() == Some(index))
        {
            Some(index + 1)
        } else {
            Some(index)
        }
    }

    /// Resolves `selector` starting from the token at `index`.
    #[must_use]
    pub fn get(&self, index: usize, selector: Selector<'_>) -> Option<usize> {
        match selector {
            Selector::Key(name) => self.member(index, name),
            Selector::Index(n) => self.element(index, n),
            Selector::Value => self.value(index),
        }
    }

    /// The raw bytes of a complete token, without quotes for strings.
    #[must_use]
    pub fn bytes(&self, index: usize) -> Option<&'a [u8]> {
        let span = self.token(index)?.span()?;
        self.json.get(span)
    }

    /// [`bytes`](Self::bytes) as a [`BStr`].
    #[must_use]
    pub fn as_bstr(&self, index: usize) -> Option<&'a BStr> {
        self.bytes(index).map(ByteSlice::as_bstr)
    }

    /// [`bytes`](Self::bytes) as UTF-8. Escapes are not decoded.
    #[must_use]
    pub fn as_str(&self, index: usize) -> Option<&'a str> {
        self.bytes(index).and_then(|bytes| bytes.to_str().ok())
    }

    /// Whether the raw content of the token equals `text`.
    #[must_use]
    pub fn eq_str(&self, index: usize, text: &str) -> bool {
        self.bytes(index) == Some(text.as_bytes())
    }

    /// A primitive read as a decimal, hexadecimal or octal integer.
    #[must_use]
    pub fn as_i64(&self, index: usize) -> Option<i64> {
        parse_int(self.number(index)?)
    }

    /// A primitive read as a float. Integers are read the way
    /// [`as_i64`](Self::as_i64) reads them, so `017` is `15.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self, index: usize) -> Option<f64> {
        let bytes = self.number(index)?;
        parse_int(bytes).map(|value| value as f64).or_else(|| {
            bytes
                .to_str()
                .ok()
                .and_then(|text| text.parse::<f64>().ok())
                .filter(|value| value.is_finite())
        })
    }

    /// `true` or `false`.
    #[must_use]
    pub fn as_bool(&self, index: usize) -> Option<bool> {
        match self.primitive(index)? {
            b"true" => Some(true),
            b"false" => Some(false),
            _ => None,
        }
    }

    /// Whether the token is the primitive `null`.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.primitive(index) == Some(b"null".as_slice())
    }

    fn primitive(&self, index: usize) -> Option<&'a [u8]> {
        if self.kind(index) != TokenKind::Primitive {
            return None;
        }
        self.bytes(index)
    }

    fn number(&self, index: usize) -> Option<&'a [u8]> {
        self.primitive(index)
            .filter(|bytes| matches!(bytes.first(), Some(b'-' | b'+' | b'0'..=b'9')))
    }
}

/// Iterator over the direct children of a token, see
/// [`Document::children`].
#[derive(Debug, Clone)]
pub struct Children<'a> {
    tokens: &'a [Token],
    parent: usize,
    next: usize,
    remaining: usize,
}

impl Iterator for Children<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.remaining > 0 {
            let index = self.next;
            let token = self.tokens.get(index)?;
            self.next += 1;
            if token.parent() == Some(self.parent) {
                self.remaining -= 1;
                return Some(index);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl FusedIterator for Children<'_> {}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use rstest::rstest;

    use super::*;
    use crate::tokenizer::Tokenizer;

    fn with_doc<R>(json: &[u8], f: impl FnOnce(Document<'_>) -> R) -> R {
        let mut tokens = [Token::default(); 32];
        let count = Tokenizer::default().parse(json, &mut tokens).unwrap();
        f(Document::new(json, &tokens[..count]))
    }

    #[test]
    fn first_duplicate_key_wins() {
        with_doc(br#"{"a": 1, "a": 2}"#, |doc| {
            let value = doc.member(0, "a").unwrap();
            assert_eq!(doc.as_i64(value), Some(1));
            assert_eq!(doc.key(0, "a"), Some(1));
        });
    }

    #[test]
    fn lookups_do_not_recurse_into_grandchildren() {
        with_doc(br#"{"outer": {"inner": 1}}"#, |doc| {
            assert_eq!(doc.member(0, "inner"), None);
            let outer = doc.member(0, "outer").unwrap();
            assert_eq!(doc.member(outer, "inner").and_then(|v| doc.as_i64(v)), Some(1));
        });
    }

    #[test]
    fn keys_compare_raw_bytes() {
        with_doc(br#"{"Method": 1, "method": 2}"#, |doc| {
            assert_eq!(doc.member(0, "METHOD"), None);
            assert_eq!(doc.member(0, "method").and_then(|v| doc.as_i64(v)), Some(2));
            assert_eq!(doc.member(0, "Method").and_then(|v| doc.as_i64(v)), Some(1));
        });
    }

    #[test]
    fn key_without_value_has_no_member() {
        let json = br#"{"a"}"#;
        with_doc(json, |doc| {
            assert_eq!(doc.key(0, "a"), Some(1));
            assert_eq!(doc.member(0, "a"), None);
        });
    }

    #[rstest]
    #[case(0, Some(b"1".as_slice()))]
    #[case(2, Some(b"x".as_slice()))]
    #[case(3, None)]
    fn elements_by_position(#[case] n: usize, #[case] expected: Option<&[u8]>) {
        with_doc(br#"[1, [2, 3], "x"]"#, |doc| {
            assert_eq!(doc.element(0, n).and_then(|t| doc.bytes(t)), expected);
        });
    }

    #[test]
    fn kind_mismatch_is_not_found() {
        with_doc(br#"{"a": [1]}"#, |doc| {
            assert_eq!(doc.element(0, 0), None);
            let array = doc.member(0, "a").unwrap();
            assert_eq!(doc.member(array, "a"), None);
            assert_eq!(doc.get(array, Selector::Key("a")), None);
            assert_eq!(doc.kind(99), TokenKind::Undefined);
        });
    }

    #[test]
    fn value_unwraps_keys_only() {
        with_doc(br#"{"a": "b", "c": [1]}"#, |doc| {
            assert_eq!(doc.value(1), Some(2));
            assert_eq!(doc.get(2, Selector::Value), Some(2));
            assert_eq!(doc.value(0), Some(0));
            // an array is returned as-is even though its element follows it
            let array = doc.member(0, "c").unwrap();
            assert_eq!(doc.value(array), Some(array));
            assert_eq!(doc.value(42), None);
        });
    }

    #[test]
    fn entries_and_children() {
        with_doc(br#"{"x": 1, "y": {"z": 2}, "w": 3}"#, |doc| {
            let keys: Vec<_> = doc.children(0).filter_map(|k| doc.as_str(k)).collect();
            assert_eq!(keys, ["x", "y", "w"]);
            let (key, value) = doc.entry(0, 2).unwrap();
            assert_eq!(doc.as_str(key), Some("w"));
            assert_eq!(value.and_then(|v| doc.as_i64(v)), Some(3));
            assert_eq!(doc.entry(0, 3), None);
        });
    }

    #[test]
    fn scalar_views() {
        with_doc(br#"[true, false, null, -1.5e1, "2", 0x10, 017]"#, |doc| {
            let at = |n| doc.element(0, n).unwrap();
            assert_eq!(doc.as_bool(at(0)), Some(true));
            assert_eq!(doc.as_bool(at(1)), Some(false));
            assert!(doc.is_null(at(2)));
            assert_eq!(doc.as_f64(at(3)), Some(-15.0));
            assert_eq!(doc.as_i64(at(3)), None);
            // strings are never numbers
            assert_eq!(doc.as_i64(at(4)), None);
            assert_eq!(doc.as_i64(at(5)), Some(16));
            assert_eq!(doc.as_f64(at(5)), Some(16.0));
            assert_eq!(doc.as_i64(at(6)), Some(15));
            assert_eq!(doc.as_f64(at(6)), Some(15.0));
            assert_eq!(doc.as_bool(at(2)), None);
            assert!(!doc.is_null(at(0)));
        });
    }

    #[test]
    fn views_are_zero_copy() {
        let json = br#"{"k": "v\n"}"#;
        with_doc(json, |doc| {
            let value = doc.member(0, "k").unwrap();
            let bytes = doc.bytes(value).unwrap();
            assert_eq!(bytes, br"v\n");
            assert!(core::ptr::eq(bytes.as_ptr(), json[7..].as_ptr()));
            assert_eq!(doc.as_bstr(value).unwrap(), r"v\n");
        });
    }
}
