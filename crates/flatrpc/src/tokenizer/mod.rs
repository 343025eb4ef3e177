//! Single-pass JSON tokenizer producing a flat token array.
//!
//! The tokenizer walks the input once and writes one [`Token`] per object,
//! array, string and primitive into a caller-owned slice. Nesting is
//! expressed only through parent indices, so no stack is needed: the
//! "current open container" is a single index, and closing a container walks
//! parent links back to the innermost open one.
//!
//! State between calls
//! - `pos` is the offset of the next byte to look at.
//! - `next` is the number of tokens written so far.
//! - `open` is the token new values attach to: an open object or array, or
//!   a key right after its `:`.
//!
//! When a call fails with [`ErrorKind::Incomplete`] or
//! [`ErrorKind::CapacityExceeded`], `pos` is left at the start of the
//! unfinished token. Calling again with a longer buffer (same prefix) or a
//! larger slice (holding the previous tokens) continues where it stopped.
//!
//! Invariants
//! - Tokens are written in pre-order; descendants of a token occupy a
//!   contiguous range right after it.
//! - Strings and primitives are complete when written; only containers are
//!   ever open.
//! - Bytes at or past `json.len()` are never read.

use tracing::{debug, trace};

use crate::{
    error::{ErrorKind, TokenizeError},
    options::TokenizerOptions,
    token::{Token, TokenKind},
};

/// A resumable JSON tokenizer.
///
/// ```rust
/// use flatrpc::{Token, TokenKind, Tokenizer, TokenizerOptions};
///
/// let mut tokens = [Token::default(); 8];
/// let mut tokenizer = Tokenizer::new(TokenizerOptions::default());
/// let count = tokenizer.parse(br#"{"a": [1, 2]}"#, &mut tokens)?;
/// assert_eq!(count, 5);
/// assert_eq!(tokens[2].kind(), TokenKind::Array);
/// assert_eq!(tokens[2].parent(), Some(1));
/// # Ok::<(), flatrpc::TokenizeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Tokenizer {
    options: TokenizerOptions,
    pos: usize,
    next: usize,
    open: Option<usize>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerOptions::default())
    }
}

impl Tokenizer {
    /// Creates a tokenizer positioned at the start of the input.
    #[must_use]
    pub const fn new(options: TokenizerOptions) -> Self {
        Self {
            options,
            pos: 0,
            next: 0,
            open: None,
        }
    }

    /// Forgets all progress so the tokenizer can scan a new document.
    pub fn reset(&mut self) {
        *self = Self::new(self.options);
    }

    /// Offset of the next byte the tokenizer will look at.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Number of tokens written so far.
    #[must_use]
    pub const fn token_count(&self) -> usize {
        self.next
    }

    /// Counts the tokens `json` needs without storing any.
    ///
    /// Structural checks that depend on stored tokens (mismatched closers,
    /// key placement) are skipped, so a successful count does not imply a
    /// successful [`parse`](Self::parse).
    ///
    /// # Errors
    ///
    /// Fails on malformed strings or primitives, or when a string or
    /// strict-mode primitive runs into the end of the input.
    pub fn count(json: &[u8], options: TokenizerOptions) -> Result<usize, TokenizeError> {
        Self::new(options).run(json, None)
    }

    /// Tokenizes `json` into `tokens`, returning the number of tokens
    /// written.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::CapacityExceeded`] when `tokens` is too small,
    /// - [`ErrorKind::InvalidCharacter`] on a structurally invalid byte,
    /// - [`ErrorKind::Incomplete`] when the input ends inside a value.
    ///
    /// Tokens written before the failure stay valid.
    pub fn parse(&mut self, json: &[u8], tokens: &mut [Token]) -> Result<usize, TokenizeError> {
        let result = self.run(json, Some(tokens));
        match &result {
            Ok(count) => trace!(count, bytes = json.len(), "tokenized"),
            Err(err) => debug!(error = %err, "tokenizing stopped"),
        }
        result
    }

    fn run(
        &mut self,
        json: &[u8],
        mut tokens: Option<&mut [Token]>,
    ) -> Result<usize, TokenizeError> {
        let mut count = self.next;

        while let Some(&byte) = json.get(self.pos) {
            match byte {
                b'{' | b'[' => {
                    count += 1;
                    if let Some(tokens) = tokens.as_deref_mut() {
                        let kind = if byte == b'{' {
                            TokenKind::Object
                        } else {
                            TokenKind::Array
                        };
                        self.open_container(tokens, kind, byte)?;
                    }
                }
                b'}' | b']' => {
                    if let Some(tokens) = tokens.as_deref_mut() {
                        let kind = if byte == b'}' {
                            TokenKind::Object
                        } else {
                            TokenKind::Array
                        };
                        self.close_container(tokens, kind, byte)?;
                    }
                }
                b'"' => {
                    if let Some(tokens) = tokens.as_deref_mut() {
                        self.check_value_slot(tokens, byte)?;
                    }
                    self.string(json, tokens.as_deref_mut())?;
                    count += 1;
                    self.adopt(tokens.as_deref_mut());
                }
                b'\t' | b'\r' | b'\n' | b' ' => {}
                b':' => {
                    if let Some(tokens) = tokens.as_deref() {
                        if self.options.strict && !self.follows_key(tokens) {
                            return Err(self.error(ErrorKind::InvalidCharacter(byte), self.pos));
                        }
                    }
                    self.open = self.next.checked_sub(1);
                }
                b',' => {
                    if let (Some(tokens), Some(open)) = (tokens.as_deref(), self.open) {
                        if !tokens[open].kind.is_container() {
                            self.open = tokens[open].parent;
                        }
                    }
                }
                _ => {
                    if self.options.strict {
                        if !matches!(byte, b'-' | b'0'..=b'9' | b't' | b'f' | b'n') {
                            return Err(self.error(ErrorKind::InvalidCharacter(byte), self.pos));
                        }
                        if let Some(tokens) = tokens.as_deref() {
                            if !self.accepts_primitive(tokens) {
                                return Err(
                                    self.error(ErrorKind::InvalidCharacter(byte), self.pos)
                                );
                            }
                        }
                    }
                    self.primitive(json, tokens.as_deref_mut())?;
                    count += 1;
                    self.adopt(tokens.as_deref_mut());
                }
            }
            self.pos += 1;
        }

        if let Some(tokens) = tokens.as_deref() {
            if tokens[..self.next].iter().any(|t| !t.is_complete()) {
                return Err(self.error(ErrorKind::Incomplete, json.len()));
            }
        }

        Ok(count)
    }

    fn error(&self, kind: ErrorKind, position: usize) -> TokenizeError {
        TokenizeError {
            kind,
            position,
            tokens: self.next,
        }
    }

    /// Writes `token` into the next free slot, failing with the position of
    /// the token's first byte when there is none.
    fn alloc(&mut self, tokens: &mut [Token], token: Token, at: usize) -> Result<usize, TokenizeError> {
        let Some(slot) = tokens.get_mut(self.next) else {
            return Err(self.error(ErrorKind::CapacityExceeded, at));
        };
        *slot = token;
        self.next += 1;
        Ok(self.next - 1)
    }

    /// Counts the token just written as a child of the open token.
    fn adopt(&self, tokens: Option<&mut [Token]>) {
        if let (Some(tokens), Some(open)) = (tokens, self.open) {
            tokens[open].children += 1;
        }
    }

    /// A new value may not sit where a key is expected (strict mode), nor
    /// be a second value of the same key.
    fn check_value_slot(&self, tokens: &[Token], byte: u8) -> Result<(), TokenizeError> {
        if !self.options.strict {
            return Ok(());
        }
        match self.open.map(|open| &tokens[open]) {
            Some(key) if key.kind == TokenKind::String && key.children != 0 => {
                Err(self.error(ErrorKind::InvalidCharacter(byte), self.pos))
            }
            _ => Ok(()),
        }
    }

    fn accepts_primitive(&self, tokens: &[Token]) -> bool {
        match self.open.map(|open| &tokens[open]) {
            Some(parent) if parent.kind == TokenKind::Object => false,
            Some(parent) if parent.kind == TokenKind::String => parent.children == 0,
            _ => true,
        }
    }

    /// A `:` must directly follow a key that has no value yet.
    fn follows_key(&self, tokens: &[Token]) -> bool {
        let Some(last) = self.next.checked_sub(1) else {
            return false;
        };
        let key = &tokens[last];
        key.kind == TokenKind::String
            && key.children == 0
            && self.open == key.parent
            && key
                .parent
                .is_some_and(|parent| tokens[parent].kind == TokenKind::Object)
    }

    fn open_container(
        &mut self,
        tokens: &mut [Token],
        kind: TokenKind,
        byte: u8,
    ) -> Result<(), TokenizeError> {
        if self.options.strict
            && self
                .open
                .is_some_and(|open| tokens[open].kind == TokenKind::Object)
        {
            // an object or array can't become a key
            return Err(self.error(ErrorKind::InvalidCharacter(byte), self.pos));
        }
        self.check_value_slot(tokens, byte)?;

        let index = self.alloc(tokens, Token::open(kind, self.pos, self.open), self.pos)?;
        self.adopt(Some(tokens));
        self.open = Some(index);
        Ok(())
    }

    fn close_container(
        &mut self,
        tokens: &mut [Token],
        kind: TokenKind,
        byte: u8,
    ) -> Result<(), TokenizeError> {
        let mut cursor = self.next.checked_sub(1);
        while let Some(index) = cursor {
            let token = &mut tokens[index];
            if !token.is_complete() {
                if token.kind != kind {
                    return Err(self.error(ErrorKind::InvalidCharacter(byte), self.pos));
                }
                token.end = Some(self.pos + 1);
                self.open = token.parent;
                return Ok(());
            }
            cursor = token.parent;
        }
        Err(self.error(ErrorKind::InvalidCharacter(byte), self.pos))
    }

    fn string(&mut self, json: &[u8], tokens: Option<&mut [Token]>) -> Result<(), TokenizeError> {
        let start = self.pos;
        self.pos += 1;

        while let Some(&byte) = json.get(self.pos) {
            if byte == b'"' {
                if let Some(tokens) = tokens {
                    let token = Token::closed(TokenKind::String, start + 1..self.pos, self.open);
                    if let Err(err) = self.alloc(tokens, token, start) {
                        self.pos = start;
                        return Err(err);
                    }
                }
                return Ok(());
            }

            if byte == b'\\' && self.pos + 1 < json.len() {
                self.pos += 1;
                match json[self.pos] {
                    b'"' | b'/' | b'\\' | b'b' | b'f' | b'r' | b'n' | b't' => {}
                    b'u' => {
                        self.pos += 1;
                        let mut digits = 0;
                        while digits < 4 && self.pos < json.len() {
                            let hex = json[self.pos];
                            if !hex.is_ascii_hexdigit() {
                                let err = self.error(ErrorKind::InvalidCharacter(hex), self.pos);
                                self.pos = start;
                                return Err(err);
                            }
                            self.pos += 1;
                            digits += 1;
                        }
                        self.pos -= 1;
                    }
                    other if self.options.strict => {
                        let err = self.error(ErrorKind::InvalidCharacter(other), self.pos);
                        self.pos = start;
                        return Err(err);
                    }
                    _ => {}
                }
            }
            self.pos += 1;
        }

        self.pos = start;
        Err(self.error(ErrorKind::Incomplete, json.len()))
    }

    fn primitive(
        &mut self,
        json: &[u8],
        tokens: Option<&mut [Token]>,
    ) -> Result<(), TokenizeError> {
        let start = self.pos;

        while let Some(&byte) = json.get(self.pos) {
            match byte {
                b'\t' | b'\r' | b'\n' | b' ' | b',' | b':' | b']' | b'}' => break,
                0..=31 | 127.. => {
                    let err = self.error(ErrorKind::InvalidCharacter(byte), self.pos);
                    self.pos = start;
                    return Err(err);
                }
                _ => self.pos += 1,
            }
        }

        if self.pos == json.len() && self.options.strict {
            // more digits may follow
            self.pos = start;
            return Err(self.error(ErrorKind::Incomplete, json.len()));
        }

        if let Some(tokens) = tokens {
            let token = Token::closed(TokenKind::Primitive, start..self.pos, self.open);
            if let Err(err) = self.alloc(tokens, token, start) {
                self.pos = start;
                return Err(err);
            }
        }
        // the delimiter is looked at again by the main loop
        self.pos -= 1;
        Ok(())
    }
}
