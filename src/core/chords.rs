use crate::config::station::normalize_host;
use crate::domain::model::{ChordsRecord, Measurement};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use url::Url;

pub const URL_CREATE_PATH: &str = "measurements/url_create";

impl ChordsRecord {
    pub fn from_measurement<C: ConfigProvider + ?Sized>(config: &C, measurement: &Measurement) -> Self {
        Self {
            instrument_id: config.instrument_id().to_string(),
            api_email: config.api_email().to_string(),
            api_key: config.api_key().to_string(),
            vars: vec![(measurement.short_name.clone(), measurement.value.clone())],
            at: measurement.timestamp,
        }
    }
}

/// Renders `<host>/measurements/url_create?instrument_id=..&<var>=..&at=..&email=..&api_key=..`.
///
/// `at` is whole seconds in UTC. A host without a scheme is reached over plain http.
pub fn build_uri(host: &str, record: &ChordsRecord) -> Result<Url> {
    let base = normalize_host(host);
    let mut uri = Url::parse(&format!("{}/{}", base, URL_CREATE_PATH))?;

    {
        let mut query = uri.query_pairs_mut();
        query.append_pair("instrument_id", &record.instrument_id);
        for (short_name, value) in &record.vars {
            query.append_pair(short_name, &value.to_string());
        }
        query.append_pair("at", &record.at.format("%Y-%m-%dT%H:%M:%SZ").to_string());
        if !record.api_email.is_empty() && !record.api_key.is_empty() {
            query.append_pair("email", &record.api_email);
            query.append_pair("api_key", &record.api_key);
        }
    }

    Ok(uri)
}

/// Same URI with the key masked, for logs.
pub fn redacted(uri: &Url) -> String {
    let mut masked = uri.clone();
    let pairs: Vec<(String, String)> = uri
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
