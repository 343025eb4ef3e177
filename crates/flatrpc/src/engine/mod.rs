//! JSON-RPC dispatch over a tokenized request.
//!
//! A call to [`Engine::handle`] goes through these steps:
//!
//! 1. tokenize the request into the caller's token slice; failure replies
//!    with a parse error,
//! 2. an object root is one request, a non-empty array root is a batch whose
//!    elements are handled in order, anything else is an invalid request,
//! 3. for each request, validate the envelope, resolve `method` in the route
//!    table and call the handler, which writes its own reply.
//!
//! Batch replies are wrapped in `[` and `]`; each fragment after the first is
//! preceded by `, `. A batch that produces no fragments leaves the output
//! empty.

mod request;

use tracing::{debug, warn};

pub use self::request::{Protocol, Request, RequestInfo};
use crate::{
    buffer::ResponseBuffer,
    document::Document,
    error::{ErrorCode, ErrorKind, TokenizeError},
    options::EngineOptions,
    token::{Token, TokenKind},
    tokenizer::Tokenizer,
};

/// A method implementation.
///
/// Implemented for every `Fn(&mut Request<'_, '_, C>) + Sync`, so plain
/// functions and closures can be registered directly.
pub trait Handler<C: ?Sized = ()>: Sync {
    /// Handles `request`, replying through its composer methods.
    fn call(&self, request: &mut Request<'_, '_, C>);
}

impl<C: ?Sized, F> Handler<C> for F
where
    F: Fn(&mut Request<'_, '_, C>) + Sync,
{
    fn call(&self, request: &mut Request<'_, '_, C>) {
        self(request);
    }
}

/// A registered method name and its handler.
pub struct Route<'h, C: ?Sized = ()> {
    name: &'h str,
    handler: &'h dyn Handler<C>,
}

impl<'h, C: ?Sized> Route<'h, C> {
    /// The method name this route answers to.
    #[must_use]
    pub const fn name(&self) -> &'h str {
        self.name
    }

    /// The handler called for the method.
    #[must_use]
    pub fn handler(&self) -> &'h dyn Handler<C> {
        self.handler
    }
}

impl<C: ?Sized> Clone for Route<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: ?Sized> Copy for Route<'_, C> {}

impl<C: ?Sized> core::fmt::Debug for Route<'_, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// How [`Engine::handle`] treated a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A single request object.
    Single,
    /// A batch of `items` elements.
    Batch {
        /// Number of elements in the batch.
        items: usize,
    },
    /// Valid JSON that is neither an object nor a non-empty array.
    Rejected,
    /// The request could not be tokenized.
    Unparsed(TokenizeError),
}

/// A JSON-RPC dispatcher over a caller-supplied route table.
///
/// Routes are appended in registration order and looked up by exact,
/// case-sensitive name; on duplicate names the first registration wins.
///
/// Handling needs only `&self`, so a fully registered engine can be shared
/// between threads; every call brings its own token slice and output buffer.
pub struct Engine<'r, 'h, C: ?Sized = ()> {
    routes: &'r mut [Option<Route<'h, C>>],
    len: usize,
    options: EngineOptions,
}

impl<'r, 'h, C: ?Sized> Engine<'r, 'h, C> {
    /// Creates an engine storing at most `routes.len()` routes in `routes`.
    /// Existing entries are cleared.
    pub fn new(routes: &'r mut [Option<Route<'h, C>>]) -> Self {
        Self::with_options(routes, EngineOptions::default())
    }

    /// Like [`new`](Self::new), with explicit options.
    pub fn with_options(routes: &'r mut [Option<Route<'h, C>>], options: EngineOptions) -> Self {
        for slot in routes.iter_mut() {
            *slot = None;
        }
        Self {
            routes,
            len: 0,
            options,
        }
    }

    /// The options this engine was created with.
    #[must_use]
    pub const fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Number of registered routes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no route is registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of routes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.routes.len()
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route<'h, C>> {
        self.routes[..self.len].iter().flatten()
    }

    /// Adds a route for `name`.
    ///
    /// Returns `false`, leaving the table unchanged, when `name` is empty or
    /// the table is full.
    pub fn register(&mut self, name: &'h str, handler: &'h dyn Handler<C>) -> bool {
        if name.is_empty() {
            warn!("ignoring a handler registered without a method name");
            return false;
        }
        let Some(slot) = self.routes.get_mut(self.len) else {
            warn!(name, capacity = self.routes.len(), "route table is full");
            return false;
        };
        *slot = Some(Route { name, handler });
        self.len += 1;
        debug!(name, "registered route");
        true
    }

    /// Finds the first route registered for `name`.
    #[must_use]
    pub fn lookup(&self, name: &[u8]) -> Option<&Route<'h, C>> {
        self.routes().find(|route| route.name.as_bytes() == name)
    }

    /// Handles one request or batch, writing the reply to `out`.
    ///
    /// `out` is cleared first and NUL-terminated last. It is left empty when
    /// nothing needs a reply. Replies that do not fit are truncated; compare
    /// [`ResponseBuffer::logical_len`] with [`ResponseBuffer::capacity`].
    ///
    /// `context` is handed unchanged to every handler.
    pub fn handle(
        &self,
        request: &[u8],
        tokens: &mut [Token],
        out: &mut ResponseBuffer<'_>,
        context: &C,
    ) -> Dispatch {
        out.clear();
        let dispatch = self.dispatch(request, tokens, out, context);
        out.finish();
        if out.is_truncated() {
            warn!(
                needed = out.logical_len(),
                capacity = out.capacity(),
                "response truncated"
            );
        }
        dispatch
    }

    fn dispatch(
        &self,
        request: &[u8],
        tokens: &mut [Token],
        out: &mut ResponseBuffer<'_>,
        context: &C,
    ) -> Dispatch {
        let mut tokenizer = Tokenizer::new(self.options.tokenizer);
        let parsed = match tokenizer.parse(request, tokens) {
            Ok(0) => Err(TokenizeError {
                kind: ErrorKind::Incomplete,
                position: request.len(),
                tokens: 0,
            }),
            other => other,
        };
        let count = match parsed {
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, "rejecting unparsable request");
                let doc = Document::new(request, &[]);
                self.reject(doc, out, context, ErrorCode::ParseError);
                return Dispatch::Unparsed(err);
            }
        };

        let doc = Document::new(request, &tokens[..count]);
        match doc.kind(0) {
            TokenKind::Object => {
                self.single(doc, 0, out, None, context);
                Dispatch::Single
            }
            TokenKind::Array if doc.children(0).next().is_some() => {
                let items = self.batch(doc, out, context);
                Dispatch::Batch { items }
            }
            kind => {
                debug!(?kind, "root is not a request");
                self.reject(doc, out, context, ErrorCode::InvalidRequest);
                Dispatch::Rejected
            }
        }
    }

    fn batch(&self, doc: Document<'_>, out: &mut ResponseBuffer<'_>, context: &C) -> usize {
        out.append_str("[");
        let start = out.logical_len();
        let mut items = 0;
        for item in doc.children(0) {
            self.single(doc, item, out, Some(start), context);
            items += 1;
        }
        if out.logical_len() == start {
            // only notifications
            out.clear();
        } else {
            out.append_str("]");
        }
        debug!(items, "handled batch");
        items
    }

    /// Replies with an error to a request whose envelope was never read.
    fn reject(&self, doc: Document<'_>, out: &mut ResponseBuffer<'_>, context: &C, code: ErrorCode) {
        let mut request = Request::new(
            doc,
            RequestInfo::default(),
            out,
            None,
            context,
            self.options.sniff_window,
        );
        request.error(code);
    }

    fn single(
        &self,
        doc: Document<'_>,
        index: usize,
        out: &mut ResponseBuffer<'_>,
        batch_start: Option<usize>,
        context: &C,
    ) {
        let (info, verdict) = inspect(doc, index);
        debug!(
            protocol = ?info.protocol,
            notification = info.notification,
            "request envelope"
        );
        let mut request = Request::new(
            doc,
            info,
            out,
            batch_start,
            context,
            self.options.sniff_window,
        );

        let method = match verdict {
            Ok(method) => method,
            Err(code) => {
                debug!(code = code.code(), "invalid envelope");
                request.error(code);
                return;
            }
        };

        match self.lookup(method) {
            Some(route) => {
                debug!(method = route.name, "calling handler");
                route.handler.call(&mut request);
                if !request.is_notification() && !request.answered() {
                    warn!(method = route.name, "handler returned without replying");
                }
            }
            None => {
                debug!(method = %bstr::BStr::new(method), "method not found");
                request.error(ErrorCode::MethodNotFound);
            }
        }
    }
}

impl<C: ?Sized> core::fmt::Debug for Engine<'_, '_, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("routes", &&self.routes[..self.len])
            .field("capacity", &self.routes.len())
            .field("options", &self.options)
            .finish()
    }
}

/// Validates the envelope of the request object at `index`, returning what
/// is known about it and either the method name or the error to reply with.
fn inspect<'a>(doc: Document<'a>, index: usize) -> (RequestInfo, Result<&'a [u8], ErrorCode>) {
    let mut info = RequestInfo::default();
    if doc.kind(index) != TokenKind::Object {
        return (info, Err(ErrorCode::InvalidRequest));
    }

    if doc
        .member(index, "jsonrpc")
        .is_some_and(|version| doc.kind(version) == TokenKind::String && doc.eq_str(version, "2.0"))
    {
        info.protocol = Protocol::V2;
    }
    info.params = doc.member(index, "params");

    match doc.key(index, "id") {
        None if info.protocol == Protocol::V2 => info.notification = true,
        // 1.0 notifications carry `"id": null`
        None => return (info, Err(ErrorCode::InvalidRequest)),
        Some(key) => match doc.children(key).next() {
            Some(id) if doc.kind(id).is_scalar() => {
                info.id = Some(id);
                if info.protocol == Protocol::V1 && doc.is_null(id) {
                    info.notification = true;
                }
            }
            _ => return (info, Err(ErrorCode::InvalidRequest)),
        },
    }

    let method = doc
        .member(index, "method")
        .filter(|&method| doc.kind(method) == TokenKind::String)
        .and_then(|method| doc.bytes(method));
    match method {
        Some(method) => (info, Ok(method)),
        None => (info, Err(ErrorCode::InvalidRequest)),
    }
}
