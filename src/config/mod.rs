pub mod station;

pub use station::StationConfig;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "rtltochords")]
#[command(about = "Forward rtl_433 sensor readings to a CHORDS portal")]
pub struct CliConfig {
    /// Path to json configuration file to use.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Read from specified file instead of running rtl_433 indefinitely
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Match readings and log the CHORDS URIs without submitting them
    #[arg(long)]
    pub dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_config() {
        assert!(CliConfig::try_parse_from(["rtltochords"]).is_err());
    }

    #[test]
    fn test_cli_file_mode() {
        let cli = CliConfig::try_parse_from([
            "rtltochords",
            "-c",
            "/home/pi/.config.json",
            "-f",
            "capture.jsonl",
            "--debug",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/home/pi/.config.json"));
        assert_eq!(cli.file, Some(PathBuf::from("capture.jsonl")));
        assert!(cli.debug);
        assert!(!cli.dry_run);
    }
}
