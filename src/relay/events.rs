use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::detector::parse_detections;
use crate::models::{AlertKind, Detection};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum OutboundEvent {
    FrameProcessed {
        detections: Vec<Detection>,
        /// Unix milliseconds.
        timestamp: i64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    DetectionResult { detections: Vec<Detection> },
    Alert { kind: AlertKind, message: String },
}

impl InboundEvent {
    /// Decode `{"event": "...", "data": {...}}` pushed by the transport.
    ///
    /// Only the envelope can fail; payload fields are decoded permissively.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).context("inbound event is not valid JSON")?;

        let Some(name) = value.get("event").and_then(Value::as_str) else {
            bail!("inbound event has no event name");
        };
        let data = value.get("data").unwrap_or(&Value::Null);

        match name {
            "detection_result" => Ok(InboundEvent::DetectionResult {
                detections: parse_detections(
                    data.get("detections").unwrap_or(&Value::Null),
                    Utc::now().timestamp_millis(),
                ),
            }),
            "alert" => Ok(InboundEvent::Alert {
                kind: AlertKind::from_wire(data.get("type").and_then(Value::as_str).unwrap_or("")),
                message: data
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            other => bail!("unknown inbound event '{other}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    #[test]
    fn frame_processed_wire_shape() {
        let event = OutboundEvent::FrameProcessed {
            detections: vec![Detection::new("d1", true, 0.8, BoundingBox::default())],
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&event).expect("serialize");

        assert_eq!(json["event"], "frame_processed");
        assert_eq!(json["data"]["timestamp"], 1_700_000_000_000i64);
        assert_eq!(json["data"]["detections"][0]["hasMask"], true);
    }

    #[test]
    fn decodes_detection_result() {
        let text =
            r#"{"event":"detection_result","data":{"detections":[{"id":"x","hasMask":false}]}}"#;
        match InboundEvent::from_json(text).expect("decode") {
            InboundEvent::DetectionResult { detections } => {
                assert_eq!(detections.len(), 1);
                assert_eq!(detections[0].id, "x");
                assert!(!detections[0].has_mask);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn decodes_alert_and_maps_unknown_types_to_system() {
        let no_mask =
            InboundEvent::from_json(r#"{"event":"alert","data":{"type":"no_mask","message":"hi"}}"#)
                .expect("decode");
        assert_eq!(
            no_mask,
            InboundEvent::Alert {
                kind: AlertKind::NoMask,
                message: "hi".into()
            }
        );

        let other = InboundEvent::from_json(r#"{"event":"alert","data":{"type":"camera"}}"#)
            .expect("decode");
        assert_eq!(
            other,
            InboundEvent::Alert {
                kind: AlertKind::System,
                message: String::new()
            }
        );
    }

    #[test]
    fn rejects_broken_envelopes() {
        assert!(InboundEvent::from_json("not json").is_err());
        assert!(InboundEvent::from_json(r#"{"data":{}}"#).is_err());
        assert!(InboundEvent::from_json(r#"{"event":"reboot"}"#).is_err());
    }
}
