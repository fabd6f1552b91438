use clap::Parser;
use rtl_to_chords::domain::ports::Submitter;
use rtl_to_chords::utils::error::ErrorSeverity;
use rtl_to_chords::utils::{logger, validation::Validate};
use rtl_to_chords::{BridgeEngine, BridgeError, ChordsSender, CliConfig, DryRunSubmitter, StationConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.debug);
    } else {
        logger::init_cli_logger(cli.debug);
    }
    tracing::debug!("Debug logging enabled");

    tracing::info!("🚀 Starting RTL to Chords with {}", cli.config.display());

    // 載入並驗證配置
    let config = match StationConfig::from_file(&cli.config).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => Arc::new(config),
        Err(e) => exit_with(&e),
    };
    tracing::info!(
        "✅ Configuration loaded: instrument {} on {}, {} smart sensors",
        config.instrument_id.as_deref().unwrap_or_default(),
        config.chords_base_url(),
        config.sensor_count()
    );

    let rtl = config.rtl_settings();
    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be sent to CHORDS");
        let engine = BridgeEngine::new(config, Arc::new(DryRunSubmitter::new()), rtl);
        run(&engine, &cli).await
    } else {
        let sender = match ChordsSender::start(config.sender_settings()) {
            Ok(sender) => Arc::new(sender),
            Err(e) => exit_with(&e),
        };
        let engine = BridgeEngine::new(config, sender.clone(), rtl);
        run(&engine, &cli).await?;
        let stats = sender.stats();
        tracing::info!(
            "📊 Sent {}, retried {}, rejected {}, dropped {}",
            stats.sent,
            stats.retried,
            stats.rejected,
            stats.dropped
        );
        Ok(())
    }
}

async fn run<S: Submitter>(
    engine: &BridgeEngine<StationConfig, S>,
    cli: &CliConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.file {
        Some(path) => match engine.run_file(path).await {
            Ok(stats) => {
                tracing::info!("✅ Forwarded {} values from {}", stats.submitted, path.display());
                Ok(())
            }
            Err(e) => exit_with(&e),
        },
        None => {
            let report = engine.run_live(shutdown_signal()).await;
            tracing::info!(
                "rtl_433 ran {} times, {} values queued",
                report.runs,
                report.stats.submitted
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => tracing::warn!("Cannot listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

fn exit_with(e: &BridgeError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
