use std::{format, string::String, vec::Vec};

use quickcheck::QuickCheck;

use super::{json, respond, respond_with, with_engine};

fn tests() -> u64 {
    if is_ci::cached() { 10_000 } else { 1_000 }
}

/// Property: a numeric id is echoed unchanged.
#[test]
fn numeric_ids_are_echoed() {
    fn prop(id: i64) -> bool {
        with_engine(|engine| {
            let request = format!(r#"{{"jsonrpc": "2.0", "method": "m", "id": {id}}}"#);
            let (out, _) = respond(engine, request.as_bytes());
            out == format!(r#"{{"jsonrpc": "2.0", "result": 3, "id": {id}}}"#)
                && json(&out)["id"] == id
        })
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(i64) -> bool);
}

/// Property: a string id is echoed unchanged, quotes included.
#[test]
fn string_ids_are_echoed() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(raw: String) -> bool {
        let id: String = raw.chars().filter(char::is_ascii_alphanumeric).collect();
        with_engine(|engine| {
            let request = format!(r#"{{"method": "m", "id": "{id}"}}"#);
            let (out, _) = respond(engine, request.as_bytes());
            json(&out)["id"] == id.as_str() && out.ends_with(&format!(r#""id": "{id}"}}"#))
        })
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(String) -> bool);
}

/// Property: a batch yields exactly one fragment per item that expects a
/// reply, in order, and nothing at all when every item is a notification.
#[test]
fn batch_fragment_count() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(notifications: Vec<bool>) -> bool {
        if notifications.is_empty() {
            return true;
        }
        let items: Vec<String> = notifications
            .iter()
            .take(16)
            .enumerate()
            .map(|(n, &notification)| {
                if notification {
                    String::from(r#"{"jsonrpc": "2.0", "method": "m"}"#)
                } else {
                    format!(r#"{{"jsonrpc": "2.0", "method": "m", "id": {n}}}"#)
                }
            })
            .collect();
        let request = format!("[{}]", items.join(", "));
        let expected: Vec<usize> = notifications
            .iter()
            .take(16)
            .enumerate()
            .filter(|(_, notification)| !**notification)
            .map(|(n, _)| n)
            .collect();

        with_engine(|engine| {
            let (out, _) = respond_with(engine, request.as_bytes(), 128, 4096);
            if expected.is_empty() {
                return out.is_empty();
            }
            let reply = json(&out);
            let Some(fragments) = reply.as_array() else {
                return false;
            };
            fragments.len() == expected.len()
                && fragments
                    .iter()
                    .zip(&expected)
                    .all(|(fragment, &n)| fragment["id"] == n && fragment["result"] == 3)
        })
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Vec<bool>) -> bool);
}

/// Property: arbitrary input never breaks the output buffer bounds, whatever
/// its size.
#[test]
fn arbitrary_input_respects_buffer_bounds() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(request: Vec<u8>, tokens: u8, capacity: u8) -> bool {
        // `respond_with` asserts the buffer invariants
        with_engine(|engine| {
            respond_with(engine, &request, usize::from(tokens), usize::from(capacity));
        });
        true
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Vec<u8>, u8, u8) -> bool);
}
