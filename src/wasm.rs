use wasm_bindgen::prelude::*;

use crate::protocols::bubblegum::{self, DISCRIMINATORS, InstructionKind};
use crate::protocols::log_wrapper;
use crate::protocols::payload;
use crate::scanner::{TransactionScanner, asset, mapping};
use crate::types::{TransactionBody, b58};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = JSON)]
    fn parse(s: &str) -> JsValue;
}

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    match serde_json::to_string(value) {
        Ok(json_str) => parse(&json_str),
        Err(_) => JsValue::NULL,
    }
}

fn scan_body(body: &TransactionBody) -> JsValue {
    let events = TransactionScanner::default().scan(body);
    to_js(&events)
}

/// Every instruction kind with its discriminator and the event it produces, if any.
#[wasm_bindgen]
pub fn get_instruction_kinds() -> JsValue {
    let kinds: Vec<serde_json::Value> = DISCRIMINATORS
        .iter()
        .map(|(discriminator, kind)| {
            serde_json::json!({
                "name": kind.as_ref(),
                "discriminator": discriminator,
                "eventKind": mapping::instruction_to_event_kind(*kind).map(|k| k.to_string()),
                "roles": bubblegum::role_schema(*kind)
                    .iter()
                    .map(|role| serde_json::json!({"name": role.name, "optional": role.optional}))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    to_js(&kinds)
}

/// Classify and decode raw instruction data.
///
/// Log-wrapper leaf-schema emissions are recognized by their own tag.
#[wasm_bindgen]
pub fn classify_payload(data: &[u8]) -> JsValue {
    if log_wrapper::is_leaf_schema_event(data) {
        return match log_wrapper::decode_leaf_schema_event(data) {
            Ok(schema) => to_js(&serde_json::json!({
                "instruction": "leaf_schema_event",
                "leafSchema": schema,
            })),
            Err(e) => error_result(&e.to_string()),
        };
    }

    let kind = bubblegum::classify(data);
    if kind == InstructionKind::Unrecognized {
        return to_js(&serde_json::json!({"instruction": kind.as_ref()}));
    }
    match payload::decode(kind, data) {
        Ok(decoded) => to_js(&serde_json::json!({
            "instruction": kind.as_ref(),
            "eventKind": mapping::instruction_to_event_kind(kind).map(|k| k.to_string()),
            "decoded": decoded,
        })),
        Err(e) => error_result(&e.to_string()),
    }
}

/// Asset id (base58) for a leaf of a tree.
#[wasm_bindgen]
pub fn derive_asset_id(tree: &str, leaf_index: f64) -> JsValue {
    let merkle_tree = match b58::parse_pubkey(tree) {
        Ok(key) => key,
        Err(e) => return error_result(&e.to_string()),
    };
    if !(leaf_index >= 0.0 && leaf_index.fract() == 0.0 && leaf_index <= 2_f64.powi(53)) {
        return error_result("leafIndex must be a non-negative integer");
    }
    let asset_id = asset::derive_asset_id(&merkle_tree, leaf_index as u64);
    JsValue::from_str(&asset_id.to_string())
}

/// Scan a transaction given as RPC-shaped JSON text.
#[wasm_bindgen]
pub fn scan_transaction(json: &str) -> JsValue {
    match serde_json::from_str::<TransactionBody>(json) {
        Ok(body) => scan_body(&body),
        Err(e) => error_result(&format!("Invalid transaction JSON: {e}")),
    }
}

/// Scan a transaction given as a JS object.
#[wasm_bindgen]
pub fn scan_transaction_value(value: JsValue) -> JsValue {
    match serde_wasm_bindgen::from_value::<TransactionBody>(value) {
        Ok(body) => scan_body(&body),
        Err(e) => error_result(&format!("Invalid transaction object: {e}")),
    }
}

fn error_result(msg: &str) -> JsValue {
    let obj = serde_json::json!({"error": msg});
    to_js(&obj)
}
