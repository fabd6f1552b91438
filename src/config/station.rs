use crate::core::rtl::RtlSettings;
use crate::core::sender::SenderSettings;
use crate::domain::model::SensorConfig;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BridgeError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_RTL_COMMAND: &str = "/usr/local/bin/rtl_433";
pub const DEFAULT_FREQUENCY_HZ: u64 = 915_000_000;
/// One day of readings at one per minute.
pub const DEFAULT_MAX_QUEUE_LENGTH: usize = 10 * 60 * 24;

/// The station's `config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationConfig {
    pub chords_host: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub instrument_id: Option<String>,
    pub api_email: Option<String>,
    pub api_key: Option<String>,
    pub smart_sensors: Option<Vec<SensorConfig>>,
    pub rtl: Option<RtlConfig>,
    pub sender: Option<SenderConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RtlConfig {
    pub command: Option<String>,
    pub frequency: Option<u64>,
    pub extra_args: Option<Vec<String>>,
    pub restart_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderConfig {
    pub max_queue_length: Option<usize>,
    pub request_timeout_seconds: Option<u64>,
    pub retry_delay_seconds: Option<u64>,
    pub drain_poll_seconds: Option<u64>,
}

/// CHORDS ids are numeric in the portal but often quoted in hand-written configs.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    }))
}

impl StationConfig {
    /// 從檔案載入配置, `.toml` 走 TOML, 其餘一律當 JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(content)?;
        Self::substitute_json(&mut value, &placeholder_pattern()?);
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let mut value = toml::Value::Table(table);
        Self::substitute_toml(&mut value, &placeholder_pattern()?);
        Ok(value.try_into()?)
    }

    /// 替換環境變數 (例如 ${CHORDS_API_KEY}), 只作用在字串值上, 找不到的保留原樣
    fn substitute_env_vars(text: &str, re: &Regex) -> String {
        re.replace_all(text, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    fn substitute_json(value: &mut serde_json::Value, re: &Regex) {
        match value {
            serde_json::Value::String(s) => *s = Self::substitute_env_vars(s, re),
            serde_json::Value::Array(items) => {
                items.iter_mut().for_each(|item| Self::substitute_json(item, re))
            }
            serde_json::Value::Object(map) => {
                map.values_mut().for_each(|item| Self::substitute_json(item, re))
            }
            _ => {}
        }
    }

    fn substitute_toml(value: &mut toml::Value, re: &Regex) {
        match value {
            toml::Value::String(s) => *s = Self::substitute_env_vars(s, re),
            toml::Value::Array(items) => {
                items.iter_mut().for_each(|item| Self::substitute_toml(item, re))
            }
            toml::Value::Table(table) => {
                table.iter_mut().for_each(|(_, item)| Self::substitute_toml(item, re))
            }
            _ => {}
        }
    }

    /// `chords_host` as a URL base; bare host names default to plain http.
    pub fn chords_base_url(&self) -> String {
        normalize_host(self.chords_host.as_deref().unwrap_or_default())
    }

    pub fn rtl_settings(&self) -> RtlSettings {
        let rtl = self.rtl.clone().unwrap_or_default();
        RtlSettings {
            command: rtl.command.unwrap_or_else(|| DEFAULT_RTL_COMMAND.to_string()),
            frequency: rtl.frequency.unwrap_or(DEFAULT_FREQUENCY_HZ),
            extra_args: rtl.extra_args.unwrap_or_default(),
            restart_delay: Duration::from_secs(rtl.restart_delay_seconds.unwrap_or(1)),
        }
    }

    pub fn sender_settings(&self) -> SenderSettings {
        let sender = self.sender.clone().unwrap_or_default();
        SenderSettings {
            max_queue_length: sender.max_queue_length.unwrap_or(DEFAULT_MAX_QUEUE_LENGTH),
            request_timeout: Duration::from_secs(sender.request_timeout_seconds.unwrap_or(10)),
            retry_delay: Duration::from_secs(sender.retry_delay_seconds.unwrap_or(1)),
            drain_poll: Duration::from_secs(sender.drain_poll_seconds.unwrap_or(1)),
        }
    }

    pub fn sensor_count(&self) -> usize {
        self.smart_sensors.as_ref().map_or(0, Vec::len)
    }
}

fn placeholder_pattern() -> Result<Regex> {
    Regex::new(r"\$\{([^}]+)\}").map_err(|e| BridgeError::ConfigError {
        message: format!("placeholder pattern: {}", e),
    })
}

pub(crate) fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

impl Validate for StationConfig {
    fn validate(&self) -> Result<()> {
        let host = validation::validate_required_field("chords_host", &self.chords_host)?;
        validation::validate_non_empty_string("chords_host", host)?;
        validation::validate_url("chords_host", &self.chords_base_url())?;

        let instrument_id =
            validation::validate_required_field("instrument_id", &self.instrument_id)?;
        validation::validate_non_empty_string("instrument_id", instrument_id)?;

        let email = validation::validate_required_field("api_email", &self.api_email)?;
        validation::validate_non_empty_string("api_email", email)?;
        validation::validate_no_placeholder("api_email", email)?;

        let key = validation::validate_required_field("api_key", &self.api_key)?;
        validation::validate_non_empty_string("api_key", key)?;
        validation::validate_no_placeholder("api_key", key)?;

        let rtl = self.rtl_settings();
        validation::validate_path("rtl.command", &rtl.command)?;
        validation::validate_positive_number("rtl.frequency", rtl.frequency, 1)?;

        let sender = self.sender_settings();
        validation::validate_positive_number(
            "sender.max_queue_length",
            sender.max_queue_length as u64,
            1,
        )?;
        validation::validate_positive_number(
            "sender.request_timeout_seconds",
            sender.request_timeout.as_secs(),
            1,
        )?;

        if self.sensor_count() == 0 {
            tracing::warn!("No smart sensors defined, readings will not be forwarded");
        }

        Ok(())
    }
}

impl ConfigProvider for StationConfig {
    fn chords_host(&self) -> &str {
        self.chords_host.as_deref().unwrap_or_default()
    }

    fn instrument_id(&self) -> &str {
        self.instrument_id.as_deref().unwrap_or_default()
    }

    fn api_email(&self) -> &str {
        self.api_email.as_deref().unwrap_or_default()
    }

    fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    fn smart_sensors(&self) -> Option<&[SensorConfig]> {
        self.smart_sensors.as_deref()
    }
}
