use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "conduit_relay" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid filter directive: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("subscriber already installed: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
    #[error("filter reload failed: {0}")]
    Reload(#[from] reload::Error),
}

/// Keeps the reloadable filter reachable after init.
pub struct TelemetryGuard {
    base_level: Level,
    overrides: Arc<RwLock<Vec<(String, Level)>>>,
    handle: reload::Handle<EnvFilter, Registry>,
}

impl TelemetryGuard {
    /// Raise or lower one module's level without restarting.
    pub fn set_module_level(&self, module: &str, level: Level) -> Result<(), TelemetryError> {
        let directives = {
            let mut overrides = self.overrides.write();
            match overrides.iter().position(|(name, _)| name == module) {
                Some(i) => overrides[i].1 = level,
                None => overrides.push((module.to_owned(), level)),
            }
            filter_directives(self.base_level, &overrides)
        };
        self.handle.reload(EnvFilter::try_new(directives)?)?;
        tracing::debug!(module, %level, "module level updated");
        Ok(())
    }

    pub fn module_levels(&self) -> Vec<(String, Level)> {
        self.overrides.read().clone()
    }
}

/// Render a base level plus overrides as an `EnvFilter` directive string.
pub fn filter_directives(base: Level, module_levels: &[(String, Level)]) -> String {
    std::iter::once(base.as_str().to_lowercase())
        .chain(
            module_levels
                .iter()
                .map(|(module, level)| format!("{module}={}", level.as_str().to_lowercase())),
        )
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse "info", "DEBUG", "warn"... into a level.
pub fn parse_level(value: &str) -> Option<Level> {
    Level::from_str(value.trim()).ok()
}

/// Initialize the telemetry subsystem. Call once at startup. Output goes to
/// stderr so it never interleaves with rendered stream output.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter_directives(config.log_level, &config.module_levels))?,
    };
    let (filter_layer, handle) = reload::Layer::new(env_filter);

    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_list(true)
    });
    let text_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(json_layer)
        .with(text_layer)
        .try_init()?;

    Ok(TelemetryGuard {
        base_level: config.log_level,
        overrides: Arc::new(RwLock::new(config.module_levels)),
        handle,
    })
}
