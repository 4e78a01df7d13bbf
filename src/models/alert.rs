use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    NoMask,
    System,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::NoMask => "no_mask",
            AlertKind::System => "system",
        }
    }

    /// Lenient mapping used for alert types pushed in from the transport.
    /// Anything unrecognised is treated as a system condition.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "no_mask" | "noMask" => AlertKind::NoMask,
            _ => AlertKind::System,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_match_wire_names() {
        for kind in [AlertKind::NoMask, AlertKind::System] {
            let wire = serde_json::to_value(kind).expect("serialize");
            assert_eq!(wire, kind.as_str());
            assert_eq!(AlertKind::from_wire(kind.as_str()), kind);
        }
    }
}
