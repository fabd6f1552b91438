#![cfg(unix)]

use async_trait::async_trait;
use rtl_to_chords::core::rtl::RtlSettings;
use rtl_to_chords::domain::ports::Submitter;
use rtl_to_chords::{BridgeEngine, StationConfig};
use std::os::unix::fs::PermissionsExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

#[derive(Default)]
struct RecordingSubmitter {
    uris: Mutex<Vec<Url>>,
}

impl RecordingSubmitter {
    fn count(&self) -> usize {
        self.uris.lock().unwrap().len()
    }
}

#[async_trait]
impl Submitter for RecordingSubmitter {
    fn submit(&self, uri: Url) {
        self.uris.lock().unwrap().push(uri);
    }

    fn waiting(&self) -> usize {
        0
    }

    async fn drain(&self) {}
}

/// Stand-in for rtl_433: prints one reading and exits, whatever the arguments.
fn fake_decoder(dir: &TempDir) -> String {
    let path = dir.path().join("fake_rtl_433");
    let script = "#!/bin/sh\necho '{\"model\":\"Acurite-5n1\",\"id\":1234,\"temperature_F\":70.1}'\n";
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn station_config() -> StationConfig {
    StationConfig::from_json_str(
        r#"{
            "chords_host": "chords.example.org",
            "instrument_id": "2",
            "api_email": "pi@example.org",
            "api_key": "k",
            "smart_sensors": [
                {
                    "model": "Acurite-5n1",
                    "id": 1234,
                    "variables": [{"rtl_name": "temperature_F", "chords_short_name": "t"}]
                }
            ]
        }"#,
    )
    .unwrap()
}

#[tokio::test]
async fn test_decoder_is_restarted_after_exit() {
    let temp_dir = TempDir::new().unwrap();
    let rtl = RtlSettings {
        command: fake_decoder(&temp_dir),
        frequency: 915_000_000,
        extra_args: vec![],
        restart_delay: Duration::from_millis(20),
    };
    let submitter = Arc::new(RecordingSubmitter::default());
    let engine = BridgeEngine::new(Arc::new(station_config()), submitter.clone(), rtl)
        .with_shutdown_drain_limit(Duration::from_secs(1));

    let watched = submitter.clone();
    let shutdown = async move {
        for _ in 0..500 {
            if watched.count() >= 3 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };

    let report = tokio::time::timeout(Duration::from_secs(15), engine.run_live(shutdown))
        .await
        .expect("supervisor should stop when shutdown resolves");

    assert!(submitter.count() >= 3);
    assert!(report.runs >= 3);
    let uris = submitter.uris.lock().unwrap();
    assert!(uris[0].as_str().contains("t=70.1"));
    assert!(uris[0].as_str().contains("instrument_id=2"));
}

#[tokio::test]
async fn test_missing_decoder_keeps_retrying_until_shutdown() {
    let rtl = RtlSettings {
        command: "/nonexistent/rtl_433".to_string(),
        frequency: 915_000_000,
        extra_args: vec![],
        restart_delay: Duration::from_millis(10),
    };
    let submitter = Arc::new(RecordingSubmitter::default());
    let engine = BridgeEngine::new(Arc::new(station_config()), submitter.clone(), rtl);

    let report = engine
        .run_live(tokio::time::sleep(Duration::from_millis(200)))
        .await;

    assert!(report.runs >= 2);
    assert_eq!(report.stats.submitted, 0);
    assert_eq!(submitter.count(), 0);
}

/// Never delivers anything: `drain` only returns when cancelled.
struct StuckSubmitter;

#[async_trait]
impl Submitter for StuckSubmitter {
    fn submit(&self, _uri: Url) {}

    fn waiting(&self) -> usize {
        1
    }

    async fn drain(&self) {
        std::future::pending::<()>().await
    }
}

#[tokio::test]
async fn test_shutdown_drain_is_bounded() {
    let rtl = RtlSettings {
        command: "/nonexistent/rtl_433".to_string(),
        frequency: 915_000_000,
        extra_args: vec![],
        restart_delay: Duration::from_millis(10),
    };
    let engine = BridgeEngine::new(Arc::new(station_config()), Arc::new(StuckSubmitter), rtl)
        .with_shutdown_drain_limit(Duration::from_millis(100));

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        engine.run_live(tokio::time::sleep(Duration::from_millis(50))),
    )
    .await
    .expect("run_live should give up draining after the limit");

    assert!(report.runs >= 1);
}
