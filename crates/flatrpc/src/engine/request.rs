use core::fmt::{self, Write};

use crate::{
    buffer::ResponseBuffer,
    document::Document,
    error::ErrorCode,
    token::TokenKind,
};

/// The JSON-RPC dialect of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
pub enum Protocol {
    /// No `"jsonrpc": "2.0"` member. Replies carry `"error": null` next to
    /// the result.
    #[default]
    V1,
    /// `"jsonrpc": "2.0"`.
    V2,
}

/// What the engine learned about a request before calling its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
pub struct RequestInfo {
    /// Token index of the value of `id`, if it is present and a string or
    /// primitive.
    pub id: Option<usize>,
    /// Token index of the value of `params`.
    pub params: Option<usize>,
    /// The dialect the reply is written in.
    pub protocol: Protocol,
    /// Whether the request expects no reply.
    pub notification: bool,
}

/// Stripped prefix of a request that announces JSON-RPC 2.0.
const MARKER: &[u8] = br#"{"jsonrpc":"2.0","#;

/// Guesses the dialect of a request that could not be tokenized from the
/// first `window` non-whitespace bytes.
pub(crate) fn sniff_protocol(source: &[u8], window: usize) -> Protocol {
    if window < MARKER.len() {
        return Protocol::V1;
    }
    let mut stripped = source
        .iter()
        .filter(|&&byte| !matches!(byte, b' ' | b'\t' | b'\r' | b'\n'))
        .take(window);
    if MARKER.iter().all(|expected| stripped.next() == Some(expected)) {
        Protocol::V2
    } else {
        Protocol::V1
    }
}

/// A request being handled, and the place its reply is written to.
///
/// Handlers read their parameters through [`document`](Self::document) and
/// reply with exactly one of:
///
/// - [`result`](Self::result) or [`result_fmt`](Self::result_fmt) for a
///   complete result value,
/// - [`begin_result`](Self::begin_result), any number of
///   [`append`](Self::append) / [`append_string`](Self::append_string)
///   calls, then [`end_result`](Self::end_result),
/// - [`error`](Self::error) or [`error_with`](Self::error_with).
///
/// All of these write nothing for a notification.
pub struct Request<'a, 'o, C: ?Sized = ()> {
    doc: Document<'a>,
    info: RequestInfo,
    out: &'a mut ResponseBuffer<'o>,
    batch_start: Option<usize>,
    context: &'a C,
    sniff_window: usize,
    answered: bool,
}

impl<'a, 'o, C: ?Sized> Request<'a, 'o, C> {
    pub(crate) fn new(
        doc: Document<'a>,
        info: RequestInfo,
        out: &'a mut ResponseBuffer<'o>,
        batch_start: Option<usize>,
        context: &'a C,
        sniff_window: usize,
    ) -> Self {
        Self {
            doc,
            info,
            out,
            batch_start,
            context,
            sniff_window,
            answered: false,
        }
    }

    pub(crate) const fn answered(&self) -> bool {
        self.answered
    }

    /// The tokenized request (the whole batch, for a batch item).
    #[must_use]
    pub const fn document(&self) -> Document<'a> {
        self.doc
    }

    /// Envelope details of this request.
    #[must_use]
    pub const fn info(&self) -> &RequestInfo {
        &self.info
    }

    /// Token index of `params`.
    #[must_use]
    pub const fn params(&self) -> Option<usize> {
        self.info.params
    }

    /// Token index of `id`.
    #[must_use]
    pub const fn id(&self) -> Option<usize> {
        self.info.id
    }

    /// Whether no reply will be written.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.info.notification
    }

    /// The dialect of the request.
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.info.protocol
    }

    /// The value passed to [`Engine::handle`](crate::Engine::handle).
    #[must_use]
    pub const fn context(&self) -> &'a C {
        self.context
    }

    /// The reply written so far, batch included.
    #[must_use]
    pub fn output(&self) -> &ResponseBuffer<'o> {
        &*self.out
    }

    /// The `n`-th element of an array `params`.
    #[must_use]
    pub fn param(&self, n: usize) -> Option<usize> {
        self.doc.element(self.info.params?, n)
    }

    /// The member `name` of an object `params`.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<usize> {
        self.doc.member(self.info.params?, name)
    }

    /// Opens a result: writes the batch separator, the envelope and the
    /// `"result": ` member name. Returns `false`, writing nothing, for a
    /// notification.
    pub fn begin_result(&mut self) -> bool {
        if self.info.notification {
            return false;
        }
        self.separate();
        self.out.append_str(match self.info.protocol {
            Protocol::V2 => r#"{"jsonrpc": "2.0", "result": "#,
            Protocol::V1 => r#"{"error": null, "result": "#,
        });
        self.answered = true;
        true
    }

    /// Appends raw JSON to an opened result.
    pub fn append(&mut self, json: &str) {
        if !self.info.notification {
            self.out.append_str(json);
        }
    }

    /// Appends `text` to an opened result as a quoted, escaped JSON string.
    pub fn append_string(&mut self, text: &str) {
        if !self.info.notification {
            self.out.append_str("\"");
            self.out.append_escaped(text);
            self.out.append_str("\"");
        }
    }

    /// Closes a result opened with [`begin_result`](Self::begin_result),
    /// echoing the id.
    pub fn end_result(&mut self) {
        if self.info.notification {
            return;
        }
        if self.info.id.is_some() {
            self.out.append_str(r#", "id": "#);
            self.echo_id();
        }
        self.out.append_str("}");
    }

    /// Replies with `json` as the result value.
    pub fn result(&mut self, json: &str) {
        if self.begin_result() {
            self.out.append_str(json);
            self.end_result();
        }
    }

    /// Replies with a formatted result value.
    ///
    /// ```rust
    /// # use flatrpc::Request;
    /// fn sum(req: &mut Request<'_, '_, ()>) {
    ///     req.result_fmt(format_args!("{}", 1 + 2));
    /// }
    /// ```
    pub fn result_fmt(&mut self, args: fmt::Arguments<'_>) {
        if self.begin_result() {
            // the buffer never fails a write
            let _ = self.out.write_fmt(args);
            self.end_result();
        }
    }

    /// Replies with one of the predefined errors.
    pub fn error(&mut self, code: ErrorCode) {
        self.error_with(code.code(), code.message());
    }

    /// Replies with an arbitrary error code and message. The message is
    /// escaped.
    pub fn error_with(&mut self, code: i32, message: &str) {
        if self.info.notification {
            return;
        }
        let protocol = if code == ErrorCode::ParseError.code() && self.info.protocol == Protocol::V1 {
            sniff_protocol(self.doc.source(), self.sniff_window)
        } else {
            self.info.protocol
        };

        self.separate();
        self.out.append_str(match protocol {
            Protocol::V2 => r#"{"jsonrpc": "2.0", "error": {"code": "#,
            Protocol::V1 => r#"{"error": {"code": "#,
        });
        let _ = write!(self.out, "{code}");
        self.out.append_str(r#", "message": ""#);
        self.out.append_escaped(message);
        self.out.append_str(r#""}"#);

        if self.info.id.is_some() {
            self.out.append_str(r#", "id": "#);
            self.echo_id();
        } else if code == ErrorCode::InvalidRequest.code() {
            self.out.append_str(r#", "id": null"#);
        }
        self.out.append_str("}");
        self.answered = true;
    }

    fn separate(&mut self) {
        if self
            .batch_start
            .is_some_and(|start| self.out.logical_len() > start)
        {
            self.out.append_str(", ");
        }
    }

    /// Writes the id exactly as the client sent it.
    fn echo_id(&mut self) {
        let Some(id) = self.info.id else {
            return;
        };
        let raw = self.doc.bytes(id).unwrap_or_default();
        if self.doc.kind(id) == TokenKind::String {
            self.out.append(b"\"");
            self.out.append(raw);
            self.out.append(b"\"");
        } else {
            self.out.append(raw);
        }
    }
}

impl<C: ?Sized> fmt::Debug for Request<'_, '_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("info", &self.info)
            .field("batch_start", &self.batch_start)
            .field("output", &self.out.as_bstr())
            .finish_non_exhaustive()
    }
}
