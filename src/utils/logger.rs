use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter(debug: bool) -> EnvFilter {
    let directives = if debug {
        "rtl_to_chords=debug,rtltochords=debug,info"
    } else {
        "rtl_to_chords=info,rtltochords=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}

pub fn init_cli_logger(debug: bool) {
    tracing_subscriber::registry()
        .with(default_filter(debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON lines on stdout, for journald or log shipping.
pub fn init_json_logger(debug: bool) {
    tracing_subscriber::registry()
        .with(default_filter(debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}
