/// Configuration options for the [`Tokenizer`](crate::Tokenizer).
///
/// # Default
///
/// Strict mode is enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerOptions {
    /// Whether to enforce the JSON grammar for keys, escapes and primitives.
    ///
    /// In strict mode:
    ///
    /// - object keys must be strings,
    /// - only the escapes `\" \\ \/ \b \f \n \r \t \uXXXX` are accepted,
    /// - primitives must start with `-`, a digit, `t`, `f` or `n`,
    /// - a key takes exactly one value,
    /// - a primitive running into the end of the input is incomplete, since
    ///   more digits could follow.
    ///
    /// When `false`, any run of non-delimiter bytes is a primitive (so
    /// `{a: b}` tokenizes), `:` also ends a primitive, unknown escapes are
    /// kept verbatim, and a primitive may end the input.
    ///
    /// # Default
    ///
    /// `true`
    pub strict: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

/// Configuration options for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Options used to tokenize every request.
    pub tokenizer: TokenizerOptions,

    /// How many non-whitespace bytes of an unparsable request are inspected
    /// to guess whether the client spoke JSON-RPC 2.0.
    ///
    /// The parse error reply uses a 2.0 envelope only when the stripped
    /// prefix reads `{"jsonrpc":"2.0",` within this window. This is a
    /// heuristic: a request that puts `jsonrpc` later, or a batch, gets a 1.0
    /// style reply. A window shorter than the marker disables the check.
    ///
    /// # Default
    ///
    /// `20`
    pub sniff_window: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerOptions::default(),
            sniff_window: 20,
        }
    }
}
