//! An allocation-free JSON-RPC engine built on a flat token array.
//!
//! Requests are scanned by a [`Tokenizer`] into a caller-owned slice of
//! [`Token`]s. Each token records its kind, its byte span in the request and
//! the index of its parent, so nested members are resolved by walking parent
//! links ([`Document`]) instead of building a tree. The [`Engine`] validates
//! the JSON-RPC envelope, looks up a registered [`Handler`] and lets it
//! compose the reply into a bounded [`ResponseBuffer`].
//!
//! Nothing in this crate allocates: handler storage, token storage and the
//! output buffer are all supplied by the caller.
//!
//! ```rust
//! use flatrpc::{Engine, Request, ResponseBuffer, Route, Token};
//!
//! fn add(req: &mut Request<'_, '_, ()>) {
//!     let doc = req.document();
//!     let sum = req
//!         .param(0)
//!         .and_then(|a| doc.as_i64(a))
//!         .zip(req.param(1).and_then(|b| doc.as_i64(b)));
//!     match sum {
//!         Some((a, b)) => req.result_fmt(format_args!("{}", a + b)),
//!         None => req.error(flatrpc::ErrorCode::InvalidParams),
//!     }
//! }
//!
//! let mut routes: [Option<Route<'_, ()>>; 4] = Default::default();
//! let mut engine = Engine::new(&mut routes);
//! engine.register("add", &add);
//!
//! let mut tokens = [Token::default(); 32];
//! let mut storage = [0u8; 128];
//! let mut out = ResponseBuffer::new(&mut storage);
//! engine.handle(
//!     br#"{"jsonrpc": "2.0", "method": "add", "params": [1, 2], "id": 7}"#,
//!     &mut tokens,
//!     &mut out,
//!     &(),
//! );
//! assert_eq!(out.as_bytes(), br#"{"jsonrpc": "2.0", "result": 3, "id": 7}"#);
//! ```

#![no_std]

#[cfg(test)]
extern crate std;

mod buffer;
mod document;
mod engine;
mod error;
mod numbers;
mod options;
mod token;
mod tokenizer;

#[cfg(test)]
mod tests;

pub use bstr::BStr;
pub use buffer::ResponseBuffer;
pub use document::{Children, Document, Selector};
pub use engine::{Dispatch, Engine, Handler, Protocol, Request, RequestInfo, Route};
pub use error::{ErrorCode, ErrorKind, TokenizeError};
pub use numbers::parse_int;
pub use options::{EngineOptions, TokenizerOptions};
pub use token::{Token, TokenKind};
pub use tokenizer::Tokenizer;
