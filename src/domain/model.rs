use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One decoded packet as printed by `rtl_433 -F json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RtlReading {
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl RtlReading {
    pub fn new(data: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { data }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn model(&self) -> Option<&serde_json::Value> {
        self.data.get("model")
    }
}

/// A configured rtl_433 device whose fields get forwarded.
///
/// Every field is optional so a partly filled entry only disables itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub model: Option<String>,
    pub id: Option<serde_json::Value>,
    pub channel: Option<serde_json::Value>,
    pub variables: Option<Vec<VariableConfig>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableConfig {
    pub rtl_name: Option<String>,
    pub chords_short_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementValue {
    Number(serde_json::Number),
    Text(String),
}

impl MeasurementValue {
    /// Numbers and strings pass through, booleans become 1/0, anything else is rejected.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Some(MeasurementValue::Number(n.clone())),
            serde_json::Value::Bool(b) => Some(MeasurementValue::Number(u8::from(*b).into())),
            serde_json::Value::String(s) => Some(MeasurementValue::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementValue::Number(n) => write!(f, "{}", n),
            MeasurementValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub short_name: String,
    pub timestamp: DateTime<Utc>,
    pub value: MeasurementValue,
}

/// Everything needed to render one `measurements/url_create` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordsRecord {
    pub instrument_id: String,
    pub api_email: String,
    pub api_key: String,
    pub vars: Vec<(String, MeasurementValue)>,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_measurement_value_from_json() {
        assert_eq!(
            MeasurementValue::from_json(&json!(21.5)).unwrap().to_string(),
            "21.5"
        );
        assert_eq!(MeasurementValue::from_json(&json!(true)).unwrap().to_string(), "1");
        assert_eq!(MeasurementValue::from_json(&json!(false)).unwrap().to_string(), "0");
        assert_eq!(MeasurementValue::from_json(&json!("OK")).unwrap().to_string(), "OK");
        assert!(MeasurementValue::from_json(&json!(null)).is_none());
        assert!(MeasurementValue::from_json(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_sensor_config_tolerates_missing_fields() {
        let sensor: SensorConfig = serde_json::from_value(json!({"model": "Acurite-5n1"})).unwrap();
        assert_eq!(sensor.model.as_deref(), Some("Acurite-5n1"));
        assert!(sensor.id.is_none());
        assert!(sensor.variables.is_none());
    }
}
