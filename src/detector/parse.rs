//! Permissive decoding of detector payloads.
//!
//! Malformed fields fall back to zero/false so a batch is always ingested.
//! Accepted shapes:
//! - `has_mask` or `hasMask`
//! - bbox nested under `bbox` or flat `x`/`y`/`width`/`height` on the detection
//! - `processing_time` / `processingTime`, `frame_id` / `frameId`

use serde_json::Value;

use crate::models::{BoundingBox, Detection};

use super::DetectionResult;

pub fn parse_detection_result(value: &Value, now_ms: i64) -> DetectionResult {
    let detections = parse_detections(value.get("detections").unwrap_or(&Value::Null), now_ms);

    let processing_time =
        field(value, &["processing_time", "processingTime"]).and_then(Value::as_f64);

    let frame_id = field(value, &["frame_id", "frameId"])
        .and_then(id_string)
        .unwrap_or_else(|| now_ms.to_string());

    DetectionResult {
        detections,
        processing_time,
        frame_id,
    }
}

/// Non-array input yields an empty batch.
pub fn parse_detections(value: &Value, now_ms: i64) -> Vec<Detection> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .enumerate()
                .map(|(index, item)| parse_detection(item, index, now_ms))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_detection(item: &Value, index: usize, now_ms: i64) -> Detection {
    let id = item
        .get("id")
        .and_then(id_string)
        .unwrap_or_else(|| format!("{now_ms}-{index}"));

    let has_mask = ["has_mask", "hasMask"]
        .iter()
        .any(|key| item.get(*key).and_then(Value::as_bool).unwrap_or(false));

    let confidence = number(item, "confidence").clamp(0.0, 1.0);

    let nested = item.get("bbox").filter(|b| b.is_object());
    let coord = |key: &str| {
        nested
            .and_then(|b| b.get(key))
            .and_then(Value::as_f64)
            .unwrap_or_else(|| number(item, key))
    };

    Detection {
        id,
        has_mask,
        confidence,
        bbox: BoundingBox {
            x: coord("x"),
            y: coord("y"),
            width: coord("width"),
            height: coord("height"),
        },
    }
}

fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| value.get(*key))
}

fn number(value: &Value, key: &str) -> f64 {
    value
        .get(key)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
