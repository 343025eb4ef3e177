mod batch;
mod properties;

use std::string::String;

use crate::{Dispatch, Engine, ErrorCode, Request, ResponseBuffer, Route, Token, TokenKind};

fn three(req: &mut Request<'_, '_>) {
    req.result("3");
}

/// Replies with the raw `params` of the request.
fn echo(req: &mut Request<'_, '_>) {
    let doc = req.document();
    let params = req
        .params()
        .filter(|&params| doc.kind(params) != TokenKind::String)
        .and_then(|params| doc.as_str(params));
    match params {
        Some(params) => req.result(params),
        None => req.error(ErrorCode::InvalidParams),
    }
}

fn fail(req: &mut Request<'_, '_>) {
    req.error_with(-32000, "Something went \"wrong\"");
}

fn greet(req: &mut Request<'_, '_>) {
    if req.begin_result() {
        req.append("{\"greeting\": ");
        req.append_string("hi\tthere");
        req.append("}");
        req.end_result();
    }
}

fn sum(req: &mut Request<'_, '_>) {
    let doc = req.document();
    let mut total = 0;
    for n in 0.. {
        let Some(param) = req.param(n) else {
            break;
        };
        let Some(value) = doc.as_i64(param) else {
            req.error(ErrorCode::InvalidParams);
            return;
        };
        total += value;
    }
    req.result_fmt(format_args!("{total}"));
}

fn silent(_req: &mut Request<'_, '_>) {}

/// Runs `f` against an engine with the test routes registered.
fn with_engine<R>(f: impl FnOnce(&Engine<'_, '_>) -> R) -> R {
    let mut routes: [Option<Route<'_>>; 8] = Default::default();
    let mut engine = Engine::new(&mut routes);
    engine.register("m", &three);
    engine.register("echo", &echo);
    engine.register("fail", &fail);
    engine.register("greet", &greet);
    engine.register("sum", &sum);
    engine.register("silent", &silent);
    f(&engine)
}

/// Handles `request` with generous token and output storage.
fn respond(engine: &Engine<'_, '_>, request: &[u8]) -> (String, Dispatch) {
    respond_with(engine, request, 64, 512)
}

fn respond_with(
    engine: &Engine<'_, '_>,
    request: &[u8],
    token_capacity: usize,
    output_capacity: usize,
) -> (String, Dispatch) {
    let mut tokens = std::vec![Token::default(); token_capacity];
    let mut storage = std::vec![0xAA; output_capacity];
    let mut out = ResponseBuffer::new(&mut storage);
    let dispatch = engine.handle(request, &mut tokens, &mut out, &());
    out.assert_invariants();
    let text = String::from_utf8_lossy(out.as_bytes()).into_owned();
    (text, dispatch)
}

/// Asserts that `text` is a JSON document and returns it parsed.
fn json(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap_or_else(|err| panic!("{err}: {text}"))
}
