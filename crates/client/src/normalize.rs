//! Cart line normalization.
//!
//! Coerces untyped cart data (guest storage blobs, server snapshots, legacy
//! shapes) into well-formed [`CartLine`] values. Every function here is
//! total: invalid candidates are dropped, nothing is reported, nothing panics.
//! A corrupted storage blob must never take the cart page down with it.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::{Map, Value};

use cartsync_core::{CartLine, PLACEHOLDER_PRODUCT_NAME, Sku};

const SKU_FIELDS: &[&str] = &["sku", "id", "variantId"];
const QUANTITY_FIELDS: &[&str] = &["quantity", "qty"];
const PRODUCT_NAME_FIELDS: &[&str] = &["productName", "product_name", "name", "title"];
const VARIANT_NAME_FIELDS: &[&str] = &["variantName", "variant_name", "variantTitle"];

/// Variant title used by single-variant products; never shown.
const DEFAULT_VARIANT_TITLE: &str = "Default Title";

/// Normalize any value into a sequence of valid, SKU-unique lines.
///
/// Accepts a bare array of lines, an object carrying `items` or `lines`,
/// or a response envelope whose `data` holds one of those.
#[must_use]
pub fn normalize_lines(value: &Value) -> Vec<CartLine> {
    let candidates: &[Value] = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("items").or_else(|| map.get("lines")) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => match map.get("data") {
                Some(data @ (Value::Object(_) | Value::Array(_))) => {
                    return normalize_lines(data);
                }
                _ => &[],
            },
        },
        _ => &[],
    };

    merge_by_sku(candidates.iter().filter_map(normalize_line).collect())
}

/// Normalize a raw JSON string. Malformed JSON yields an empty sequence.
#[must_use]
pub fn normalize_str(raw: &str) -> Vec<CartLine> {
    serde_json::from_str::<Value>(raw)
        .map(|value| normalize_lines(&value))
        .unwrap_or_default()
}

/// Normalize a single candidate line.
///
/// Returns `None` when the SKU is missing or blank, or the quantity does not
/// parse to a positive integer after flooring.
#[must_use]
pub fn normalize_line(value: &Value) -> Option<CartLine> {
    let fields = value.as_object()?;

    let sku = first_field(fields, SKU_FIELDS).and_then(parse_sku)?;
    let quantity = first_field(fields, QUANTITY_FIELDS).and_then(parse_quantity)?;
    let price = fields.get("price").and_then(parse_price).unwrap_or(Decimal::ZERO);

    let product_name = first_field(fields, PRODUCT_NAME_FIELDS)
        .and_then(non_blank)
        .unwrap_or_else(|| PLACEHOLDER_PRODUCT_NAME.to_string());
    let variant_name = first_field(fields, VARIANT_NAME_FIELDS)
        .and_then(non_blank)
        .filter(|name| name != DEFAULT_VARIANT_TITLE);

    Some(CartLine {
        sku,
        product_name,
        variant_name,
        price,
        quantity,
    })
}

/// Collapse duplicate SKUs into one line each, summing quantities.
///
/// The first occurrence keeps its position. Metadata from a later duplicate
/// only replaces a placeholder product name.
#[must_use]
pub fn merge_by_sku(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    let mut positions: HashMap<Sku, usize> = HashMap::with_capacity(lines.len());

    for line in lines {
        match positions.get(&line.sku).and_then(|&pos| merged.get_mut(pos)) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                if existing.has_placeholder_name() && !line.has_placeholder_name() {
                    existing.product_name = line.product_name;
                    existing.variant_name = line.variant_name;
                    existing.price = line.price;
                }
            }
            None => {
                positions.insert(line.sku.clone(), merged.len());
                merged.push(line);
            }
        }
    }

    merged
}

fn first_field<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| fields.get(*name).filter(|v| !v.is_null()))
}

fn parse_sku(value: &Value) -> Option<Sku> {
    match value {
        Value::String(s) => Sku::parse(s).ok(),
        Value::Number(n) => Sku::parse(&n.to_string()).ok(),
        _ => None,
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_quantity(value: &Value) -> Option<u32> {
    let quantity = parse_number(value)?.floor();
    if !quantity.is_finite() || quantity < 1.0 || quantity > f64::from(u32::MAX) {
        return None;
    }
    // Range checked above
    Some(quantity as u32)
}

fn parse_price(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string())
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).and_then(Decimal::from_f64)),
        Value::String(s) => parse_decimal(s.trim()),
        // Legacy money shape: {"amount": "12.50", "currencyCode": "USD"}
        Value::Object(money) => money.get("amount").and_then(parse_price),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    s.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

fn non_blank(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
