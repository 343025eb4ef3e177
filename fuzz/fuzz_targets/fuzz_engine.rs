#![no_main]
use std::cell::RefCell;

use arbitrary::Arbitrary;
use flatrpc::{
    Engine, EngineOptions, ErrorCode, ErrorKind, Request, ResponseBuffer, Route, Token,
    TokenKind, TokenizeError, Tokenizer, TokenizerOptions,
};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use serde_json::{Map, Value};

const HEADER: usize = 5; // 1 flag + 4-byte seed

const METHODS: &[&str] = &["echo", "fail", "silent", "missing", ""];

thread_local! {
    static RNG: RefCell<SmallRng> =
        RefCell::new(SmallRng::from_os_rng());
}

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

/// Replaces the input with a generated request (or batch) every few runs,
/// so most inputs get past the tokenizer and reach the envelope checks.
fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if max_size <= HEADER || !(size < HEADER || seed.is_multiple_of(4)) {
        return fuzzer_mutate(data, size, max_size);
    }

    data[0] = with_rng(|rng| rng.next_u32() as u8);
    data[1..HEADER].copy_from_slice(&with_rng(|rng| rng.next_u32().to_le_bytes()));

    let request = with_rng(|rng| {
        if rng.random_bool(0.25) {
            let items = rng.random_range(0..6);
            Value::Array((0..items).map(|_| request(rng)).collect())
        } else {
            request(rng)
        }
    });
    let serialized = serde_json::to_vec(&request).unwrap_or_default();
    let len = serialized.len().min(max_size - HEADER);
    data[HEADER..HEADER + len].copy_from_slice(&serialized[..len]);
    HEADER + len
}

/// A request object with each envelope member present, missing or wrong.
fn request(rng: &mut SmallRng) -> Value {
    let mut object = Map::new();
    match rng.random_range(0..4) {
        0 => {}
        1 => {
            object.insert("jsonrpc".into(), "1.0".into());
        }
        2 => {
            object.insert("jsonrpc".into(), 2.0.into());
        }
        _ => {
            object.insert("jsonrpc".into(), "2.0".into());
        }
    }
    match rng.random_range(0..6) {
        0 => {}
        1 => {
            object.insert("method".into(), rng.random::<u8>().into());
        }
        _ => {
            let method = METHODS[rng.random_range(0..METHODS.len())];
            object.insert("method".into(), method.into());
        }
    }
    if rng.random_bool(0.75) {
        object.insert("params".into(), arbitrary_value(rng));
    }
    match rng.random_range(0..6) {
        0 => {}
        1 => {
            object.insert("id".into(), Value::Null);
        }
        2 => {
            object.insert("id".into(), arbitrary_value(rng));
        }
        3 => {
            object.insert("id".into(), rng.random::<u32>().to_string().into());
        }
        _ => {
            object.insert("id".into(), rng.random::<i64>().into());
        }
    }
    Value::Object(object)
}

fn arbitrary_value(rng: &mut SmallRng) -> Value {
    loop {
        let len = rng.random_range(0..64);
        let bytes: Vec<u8> = (0..len).map(|_| rng.random::<u8>()).collect();
        if let Ok(value) = ArbitraryValue::arbitrary(&mut arbitrary::Unstructured::new(&bytes)) {
            return value.0;
        }
    }
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

#[derive(Debug)]
struct ArbitraryValue(Value);

impl<'a> Arbitrary<'a> for ArbitraryValue {
    fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
        let value = match u.choose_index(16)? {
            0 => Value::Null,
            1 => Value::Bool(u.arbitrary()?),
            2 => Value::from(u.arbitrary::<i64>()?),
            3 => {
                let n: f64 = u.arbitrary()?;
                Value::Number(
                    serde_json::Number::from_f64(n).ok_or(arbitrary::Error::IncorrectFormat)?,
                )
            }
            4..=8 => Value::String(u.arbitrary()?),
            9..=12 => {
                let elems: Vec<ArbitraryValue> = u.arbitrary()?;
                Value::Array(elems.into_iter().map(|v| v.0).collect())
            }
            13..=15 => {
                let m: Vec<(String, ArbitraryValue)> = u.arbitrary()?;
                Value::Object(Map::from_iter(m.into_iter().map(|(k, v)| (k, v.0))))
            }
            _ => Err(arbitrary::Error::IncorrectFormat)?,
        };
        Ok(ArbitraryValue(value))
    }
}

fn echo(req: &mut Request<'_, '_>) {
    let doc = req.document();
    match req
        .params()
        .filter(|&params| doc.kind(params) != TokenKind::String)
        .and_then(|params| doc.as_str(params))
    {
        Some(params) => req.result(params),
        None => req.error(ErrorCode::InvalidParams),
    }
}

fn fail(req: &mut Request<'_, '_>) {
    req.error_with(-32099, "fuzz \"failure\"\n");
}

fn silent(_req: &mut Request<'_, '_>) {}

fn engine(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }

    let flags = data[0];
    let seed = u32::from_le_bytes(data[1..HEADER].try_into().unwrap()) as usize;
    let request = &data[HEADER..];
    let strict = flags & 1 == 0;

    let options = EngineOptions {
        tokenizer: TokenizerOptions { strict },
        sniff_window: usize::from((flags >> 1) & 0x1F) + 10,
    };
    let mut routes: [Option<Route<'_>>; 4] = Default::default();
    let mut engine = Engine::with_options(&mut routes, options);
    engine.register("echo", &echo);
    engine.register("fail", &fail);
    engine.register("silent", &silent);

    let mut tokens = vec![Token::default(); seed % 64];
    let mut storage = vec![0u8; (seed >> 8) % 512];
    let mut out = ResponseBuffer::new(&mut storage);
    engine.handle(request, &mut tokens, &mut out, &());
    out.assert_invariants();

    // a well-formed request always gets a well-formed reply
    if strict
        && !out.is_empty()
        && !out.is_truncated()
        && serde_json::from_slice::<Value>(request).is_ok()
    {
        if let Err(err) = serde_json::from_slice::<Value>(out.as_bytes()) {
            panic!("invalid reply ({err}): {}", out.as_bstr());
        }
    }

    if strict {
        resumed(request, seed);
    }
}

/// Tokenizing a document in two steps yields the same tokens as in one.
fn resumed(json: &[u8], seed: usize) {
    let options = TokenizerOptions::default();
    let Ok(needed) = Tokenizer::count(json, options) else {
        return;
    };
    let mut whole = vec![Token::default(); needed];
    let Ok(count) = Tokenizer::new(options).parse(json, &mut whole) else {
        return;
    };

    let split = seed % (json.len() + 1);
    let mut tokenizer = Tokenizer::new(options);
    let mut pieces = vec![Token::default(); needed];
    match tokenizer.parse(&json[..split], &mut pieces) {
        Ok(_)
        | Err(TokenizeError {
            kind: ErrorKind::Incomplete,
            ..
        }) => {}
        Err(err) => panic!("prefix of a valid document failed: {err}"),
    }
    assert_eq!(tokenizer.parse(json, &mut pieces), Ok(count));
    assert_eq!(whole[..count], pieces[..count]);
}

fuzz_target!(|data: &[u8]| engine(data));
