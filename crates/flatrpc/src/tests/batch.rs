use std::vec::Vec;

use super::{json, respond, with_engine};
use crate::Dispatch;

#[test]
fn batch_wraps_fragments_in_order() {
    with_engine(|engine| {
        let (out, dispatch) = respond(
            engine,
            br#"[{"jsonrpc": "2.0", "method": "m", "id": 1}, {"jsonrpc": "2.0", "method": "sum", "params": [2, 3], "id": 2}]"#,
        );
        insta::assert_snapshot!(out, @r#"[{"jsonrpc": "2.0", "result": 3, "id": 1}, {"jsonrpc": "2.0", "result": 5, "id": 2}]"#);
        assert_eq!(dispatch, Dispatch::Batch { items: 2 });
    });
}

#[test]
fn failures_are_isolated_per_item() {
    with_engine(|engine| {
        let (out, dispatch) = respond(
            engine,
            br#"[
                {"jsonrpc": "2.0", "method": "m", "id": "a"},
                {"jsonrpc": "2.0", "method": "nope", "id": "b"},
                {"jsonrpc": "2.0", "id": "c"},
                7,
                {"jsonrpc": "2.0", "method": "fail", "id": "d"}
            ]"#,
        );
        assert_eq!(dispatch, Dispatch::Batch { items: 5 });
        let reply = json(&out);
        let items = reply.as_array().unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0]["result"], 3);
        assert_eq!(items[1]["error"]["code"], -32601);
        assert_eq!(items[2]["error"]["code"], -32600);
        assert_eq!(items[2]["id"], "c");
        assert_eq!(items[3]["error"]["code"], -32600);
        assert!(items[3]["id"].is_null());
        assert_eq!(items[4]["error"]["code"], -32000);
    });
}

#[test]
fn notifications_are_skipped_without_stray_separators() {
    with_engine(|engine| {
        let (out, _) = respond(
            engine,
            br#"[
                {"jsonrpc": "2.0", "method": "m"},
                {"jsonrpc": "2.0", "method": "m", "id": 1},
                {"jsonrpc": "2.0", "method": "nope"},
                {"method": "m", "id": 2}
            ]"#,
        );
        assert_eq!(
            out,
            r#"[{"jsonrpc": "2.0", "result": 3, "id": 1}, {"error": null, "result": 3, "id": 2}]"#
        );
    });
}

#[test]
fn all_notification_batch_is_empty() {
    with_engine(|engine| {
        let (out, dispatch) = respond(
            engine,
            br#"[{"jsonrpc": "2.0", "method": "m"}, {"method": "m", "id": null}]"#,
        );
        assert_eq!(out, "");
        assert_eq!(dispatch, Dispatch::Batch { items: 2 });
    });
}

#[test]
fn leading_comma_yields_independent_invalid_requests() {
    with_engine(|engine| {
        let (out, dispatch) = respond(engine, b"[,233]");
        insta::assert_snapshot!(out, @r#"[{"error": {"code": -32600, "message": "Invalid Request"}, "id": null}]"#);
        assert_eq!(dispatch, Dispatch::Batch { items: 1 });

        let (out, dispatch) = respond(engine, b"[1, 2]");
        assert_eq!(dispatch, Dispatch::Batch { items: 2 });
        let reply = json(&out);
        assert_eq!(reply.as_array().map(Vec::len), Some(2));
    });
}

#[test]
fn nested_batch_is_not_recursed_into() {
    with_engine(|engine| {
        let (out, _) = respond(engine, br#"[[{"jsonrpc": "2.0", "method": "m", "id": 1}]]"#);
        assert_eq!(
            out,
            r#"[{"error": {"code": -32600, "message": "Invalid Request"}, "id": null}]"#
        );
    });
}

#[test]
fn batch_items_see_their_own_params() {
    with_engine(|engine| {
        let (out, _) = respond(
            engine,
            br#"[{"method": "sum", "params": [1, 2], "id": 1}, {"method": "sum", "params": [10, 20, 30], "id": 2}]"#,
        );
        let reply = json(&out);
        assert_eq!(reply[0]["result"], 3);
        assert_eq!(reply[1]["result"], 60);
    });
}
