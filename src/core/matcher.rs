use crate::domain::model::{Measurement, MeasurementValue, RtlReading, SensorConfig};
use crate::domain::ports::ConfigProvider;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Naive layouts rtl_433 prints for `time`, read in the host's zone.
const NAIVE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Maps one decoded reading onto CHORDS measurements.
///
/// Every configured sensor is checked, so a reading can feed several sensors.
/// Malformed sensor or variable entries are logged and skipped.
pub fn match_reading<C: ConfigProvider + ?Sized>(
    config: &C,
    reading: &RtlReading,
    now: DateTime<Utc>,
) -> Vec<Measurement> {
    let mut measurements = Vec::new();

    let sensors = match config.smart_sensors() {
        Some(sensors) if !sensors.is_empty() => sensors,
        _ => {
            tracing::warn!("No smart sensors defined, not handling RTL data.");
            return measurements;
        }
    };

    let model = match reading.model() {
        Some(Value::String(model)) => model.as_str(),
        Some(other) => {
            tracing::error!("RTL model is not a string: {}", other);
            return measurements;
        }
        None => {
            tracing::error!("No model defined in RTL data.");
            return measurements;
        }
    };

    let timestamp = reading_timestamp(reading, now);
    tracing::debug!("Timestamp is: {}", timestamp);

    for sensor in sensors {
        if !sensor_matches(sensor, model, reading) {
            continue;
        }
        tracing::info!("Found matching RTL model {}!", model);

        let Some(variables) = &sensor.variables else {
            tracing::warn!("No variables to handle for sensor {:?}", sensor);
            continue;
        };

        for variable in variables {
            let Some(short_name) = &variable.chords_short_name else {
                tracing::warn!("No chords_short_name defined for variable {:?}", variable);
                continue;
            };
            let Some(rtl_name) = &variable.rtl_name else {
                tracing::warn!("No rtl_name defined for variable {:?}", variable);
                continue;
            };
            let Some(raw) = reading.get(rtl_name) else {
                tracing::warn!("{} does not exist in data: {:?}", rtl_name, reading.data);
                continue;
            };
            let Some(value) = MeasurementValue::from_json(raw) else {
                tracing::warn!("{} has unsupported value {}", rtl_name, raw);
                continue;
            };

            tracing::info!("Found matching data for {} with value {}", rtl_name, value);
            measurements.push(Measurement {
                short_name: short_name.clone(),
                timestamp,
                value,
            });
        }
    }

    measurements
}

fn sensor_matches(sensor: &SensorConfig, model: &str, reading: &RtlReading) -> bool {
    let Some(sensor_model) = &sensor.model else {
        tracing::warn!("No model defined for sensor {:?}", sensor);
        return false;
    };
    if sensor_model != model {
        tracing::debug!(
            "Sensor model {} does not match data model {}",
            sensor_model,
            model
        );
        return false;
    }

    let Some(sensor_id) = &sensor.id else {
        tracing::warn!("No id defined for sensor {:?}", sensor);
        return false;
    };
    match reading.get("id") {
        Some(id) if values_match(sensor_id, id) => {}
        Some(id) => {
            tracing::debug!("Sensor id {} does not match data id {}", sensor_id, id);
            return false;
        }
        None => {
            tracing::debug!("No id in RTL data for model {}", model);
            return false;
        }
    }

    if let Some(channel) = &sensor.channel {
        let matched = reading
            .get("channel")
            .is_some_and(|actual| values_match(channel, actual));
        if !matched {
            tracing::debug!(
                "Sensor channel {} does not match data channel {:?}",
                channel,
                reading.get("channel")
            );
            return false;
        }
    }

    true
}

/// Equal JSON values, or a number and a string with the same text.
fn values_match(expected: &Value, actual: &Value) -> bool {
    if expected == actual {
        return true;
    }
    match (expected, actual) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            n.to_string() == s.trim()
        }
        _ => false,
    }
}

fn reading_timestamp(reading: &RtlReading, now: DateTime<Utc>) -> DateTime<Utc> {
    match reading.get("time") {
        Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
            tracing::error!("Failed to parse timestamp {}, using current time", raw);
            now
        }),
        None => {
            tracing::warn!("No timestamp in data, using current time");
            now
        }
    }
}

/// Accepts RFC 3339, rtl_433's local `YYYY-MM-DD HH:MM:SS[.f]` and unix seconds.
pub fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::Number(n) => n.as_f64().and_then(from_unix_seconds),
        Value::String(s) => parse_time_str(s.trim()),
        _ => None,
    }
}

fn parse_time_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // time:iso:tz prints the offset without a colon
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }
    s.parse::<f64>().ok().and_then(from_unix_seconds)
}

fn from_unix_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}
