//! Subscriber bootstrap and component wiring

use std::sync::Arc;

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::{LogFormat, LogOutput, TelemetryConfig};
use crate::dispatch::{BufferPolicy, Dispatcher};
use crate::exporter::TelemetryExporter;
use crate::handlers::{ExporterHandler, TracingHandler};
use crate::hooks::{
    ContextFieldHook, ContextTraceProvider, LevelCounterHook, MetricsRecordCounter, SamplingHook,
    SessionHook, SpanEventHook, TraceContextHook,
};
use crate::notify::{NotificationHandler, NotificationSender};
use crate::sanitization::Sanitizer;
use crate::{Error, Result};

/// Coordinates local subscriber setup and dispatcher wiring.
pub struct TelemetrySystem;

/// Returned by [`TelemetrySystem::init`]; logs a shutdown line when the
/// process lets it go.
pub struct TelemetryGuard {
    _inner: (),
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(
            telemetry.event = "system_shutdown",
            "Telemetry system shutting down"
        );
    }
}

impl TelemetrySystem {
    /// Initialize the process-local tracing subscriber from config.
    ///
    /// Configuration errors are detected here, eagerly, and are fatal to
    /// setup; no error surfaces from the runtime paths.
    pub fn init(config: &TelemetryConfig) -> Result<TelemetryGuard> {
        config.validate()?;

        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
        if let Some(console) = Self::build_console_layer(config) {
            layers.push(console);
        }
        if let Some(file) = Self::build_file_layer(config)? {
            layers.push(file);
        }

        Registry::default()
            .with(layers)
            .with(Self::build_env_filter(config))
            .try_init()
            .map_err(|e| Error::System {
                message: format!("Failed to initialize tracing subscriber: {}", e),
            })?;

        tracing::info!(
            telemetry.event = "system_initialized",
            version = env!("CARGO_PKG_VERSION"),
            "Telemetry system initialized"
        );

        Ok(TelemetryGuard { _inner: () })
    }

    /// Composition root for one logical logger: a dispatcher wired with
    /// the sanitizer, hooks, and handlers the configuration asks for.
    ///
    /// When an exporter is supplied, records route through it (and it
    /// handles local fallback itself); otherwise they go straight to the
    /// local subscriber. A notification sender adds protocol forwarding.
    pub fn build_logger(
        name: &str,
        config: &TelemetryConfig,
        exporter: Option<Arc<TelemetryExporter>>,
        sender: Option<Arc<dyn NotificationSender>>,
    ) -> Arc<Dispatcher> {
        let dispatcher = if config.logging.buffer_size > 0 {
            Dispatcher::buffered(
                name,
                config.logging.min_level,
                BufferPolicy {
                    capacity: config.logging.buffer_size,
                    flush_interval: config.flush_interval(),
                },
            )
        } else {
            Dispatcher::new(name, config.logging.min_level)
        };
        let dispatcher = Arc::new(dispatcher.with_sanitizer(Sanitizer::new(
            config.privacy.redacted_fields.clone(),
            config.privacy.max_payload_bytes,
        )));

        // Sampling first: the cheapest rejection after the level filter
        if config.exporter.sample_rate < 1.0 {
            dispatcher.add_hook(Arc::new(SamplingHook::new(
                config.exporter.sample_rate,
                config.exporter.sample_always_level,
            )));
        }
        if config.logging.include_trace_info {
            dispatcher.add_hook(Arc::new(TraceContextHook::new(Arc::new(
                ContextTraceProvider,
            ))));
        }
        dispatcher.add_hook(Arc::new(SessionHook));
        if !config.logging.context_fields.is_empty() {
            dispatcher.add_hook(Arc::new(ContextFieldHook::new(
                config.logging.context_fields.clone(),
            )));
        }
        dispatcher.add_hook(Arc::new(LevelCounterHook::new(Arc::new(
            MetricsRecordCounter,
        ))));
        if let Some(exporter) = &exporter {
            dispatcher.add_hook(Arc::new(SpanEventHook::new(Arc::clone(exporter))));
        }

        match exporter {
            Some(exporter) => dispatcher.add_handler(Arc::new(ExporterHandler::new(exporter))),
            None => dispatcher.add_handler(Arc::new(TracingHandler)),
        }
        if let Some(sender) = sender {
            dispatcher.add_handler(Arc::new(NotificationHandler::new(sender)));
        }

        dispatcher
    }

    fn build_env_filter(config: &TelemetryConfig) -> EnvFilter {
        if !config.enabled {
            return EnvFilter::new("off");
        }

        let level: tracing::Level = config.logging.min_level.into();
        let mut filter = EnvFilter::new(level.to_string());

        // Allow environment override
        if let Ok(env_filter) = std::env::var("RUST_LOG") {
            filter = EnvFilter::new(env_filter);
        }

        filter
    }

    fn build_console_layer(
        config: &TelemetryConfig,
    ) -> Option<Box<dyn Layer<Registry> + Send + Sync>> {
        if !matches!(config.logging.output, LogOutput::Stderr | LogOutput::Both) {
            return None;
        }

        // Stdout carries the protocol stream, so local lines go to stderr
        let layer = match config.logging.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false)
                .boxed(),
        };

        Some(layer)
    }

    fn build_file_layer(
        config: &TelemetryConfig,
    ) -> Result<Option<Box<dyn Layer<Registry> + Send + Sync>>> {
        if !matches!(config.logging.output, LogOutput::File | LogOutput::Both) {
            return Ok(None);
        }

        std::fs::create_dir_all(&config.logging.log_dir)?;

        // The rolling appender is the durable sink; rotation itself is
        // its concern, not this crate's.
        let appender = tracing_appender::rolling::daily(
            &config.logging.log_dir,
            format!("{}.log", config.logging.log_file_name),
        );

        let layer = match config.logging.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(false)
                .boxed(),
        };

        Ok(Some(layer))
    }
}
