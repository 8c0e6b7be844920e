use std::sync::Once;

/// Logger setup for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` filter directives, e.g. `"ember_engine=debug,wgpu_core=warn"`.
    /// Takes precedence over `RUST_LOG`.
    pub env_filter: Option<String>,

    /// Level used when neither `env_filter` nor `RUST_LOG` is set.
    pub default_level: log::LevelFilter,

    /// Cap wgpu internals and the shader compiler at `warn` unless a filter names them.
    pub quiet_gpu_internals: bool,

    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: log::LevelFilter::Info,
            quiet_gpu_internals: true,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

const GPU_INTERNALS: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

static INIT: Once = Once::new();

/// Installs the global logger. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = resolve_filter(&config, std::env::var("RUST_LOG").ok());

        let mut builder = env_logger::Builder::new();
        builder.filter_level(config.default_level);
        if config.quiet_gpu_internals {
            for module in GPU_INTERNALS {
                builder.filter_module(module, log::LevelFilter::Warn);
            }
        }
        if let Some(filter) = &filter {
            builder.parse_filters(filter);
        }
        builder.write_style(config.write_style);

        if builder.try_init().is_err() {
            // Someone else installed a logger first; keep theirs.
            return;
        }
        log::debug!("logging initialized (filter: {})", filter.as_deref().unwrap_or("default"));
    });
}

/// Explicit configuration wins over the environment.
fn resolve_filter(config: &LoggingConfig, env: Option<String>) -> Option<String> {
    config
        .env_filter
        .clone()
        .or(env)
        .filter(|f| !f.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_filter_overrides_environment() {
        let config = LoggingConfig {
            env_filter: Some("ember_engine=trace".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_filter(&config, Some("warn".into())).as_deref(),
            Some("ember_engine=trace")
        );
    }

    #[test]
    fn blank_filters_fall_back_to_default_level() {
        let config = LoggingConfig::default();
        assert_eq!(resolve_filter(&config, Some("  ".into())), None);
        assert_eq!(resolve_filter(&config, None), None);
        assert_eq!(resolve_filter(&config, Some("debug".into())).as_deref(), Some("debug"));
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig {
            default_level: log::LevelFilter::Trace,
            ..Default::default()
        });
    }
}
