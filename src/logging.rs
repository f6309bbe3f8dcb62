use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Once;

/// Logger configuration.
///
/// `filter` follows the `env_logger` filter syntax (e.g. "info",
/// "kawano=debug"). The terminal UI owns stdout/stderr, so interactive runs
/// write to `file` and stay silent if it cannot be opened; headless runs may
/// fall back to stderr.
#[derive(Debug, Clone, Default)]
pub(crate) struct LoggingConfig {
    pub(crate) filter: Option<String>,
    pub(crate) file: Option<PathBuf>,
    pub(crate) allow_stderr: bool,
}

static INIT: Once = Once::new();

/// Initializes the global logger once; later calls are ignored.
pub(crate) fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = &config.filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        let file = config
            .file
            .as_ref()
            .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok());
        match file {
            Some(f) => {
                builder.write_style(env_logger::WriteStyle::Never);
                builder.target(env_logger::Target::Pipe(Box::new(f)));
            }
            None if config.allow_stderr => {
                builder.target(env_logger::Target::Stderr);
            }
            // No logger installed: the macros become no-ops.
            None => return,
        }

        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}
