//! Basic telemetry usage example
//!
//! Demonstrates setting up the Corsac observability core: local
//! subscriber bootstrap, a wired dispatcher, request logging, and the
//! dual-backend exporter running in local-only mode.
//!
//! Run with: cargo run --example basic_usage

use corsac_telemetry::{
    LogContext, LogLevel, RequestLogger, TelemetryConfig, TelemetryExporter, TelemetrySystem,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    println!("🚀 Starting Corsac Telemetry Basic Usage Example");

    // Create a custom telemetry configuration
    let mut config = TelemetryConfig::default();
    config.logging.min_level = LogLevel::Debug;
    config.logging.output = corsac_telemetry::LogOutput::Both;
    config.logging.log_dir = PathBuf::from("./example_logs");
    config.logging.buffer_size = 4;
    config.logging.flush_interval_secs = 5;

    println!("📋 Initializing telemetry system...");
    let _guard = TelemetrySystem::init(&config)?;

    // No remote backend configured: everything routes locally
    let exporter = Arc::new(TelemetryExporter::from_config(&config.exporter, None));
    exporter.initialize();

    let logger = TelemetrySystem::build_logger(
        "example",
        &config,
        Some(Arc::clone(&exporter)),
        None,
    );

    println!("✅ Telemetry system initialized successfully!");

    // Leveled, structured records through the dispatcher
    let ctx = LogContext::new().with_session_id("sess-demo");
    logger.log(&ctx, LogLevel::Debug, json!("fine-grained detail"));
    logger.log(&ctx, LogLevel::Notice, json!({"phase": "startup"}));
    logger.log(
        &ctx,
        LogLevel::Warning,
        json!({"password": "hunter2", "note": "the password field is redacted"}),
    );

    // A timed operation with a completion record
    println!("🔗 Demonstrating request logging...");
    let request = RequestLogger::start(
        Arc::clone(&logger),
        Arc::clone(&exporter),
        ctx.clone(),
        "tools/call",
        true,
    )
    .with_slow_threshold(Duration::from_millis(50));

    std::thread::sleep(Duration::from_millis(20));
    logger.log(request.context(), LogLevel::Info, json!("tool running"));
    request.success();

    // Protocol event conveniences on the exporter
    println!("📊 Demonstrating protocol events...");
    exporter.request_received("tools/call", "req-1", Some("sess-demo"));
    exporter.response_completed("tools/call", "req-1", Duration::from_millis(23), None);
    exporter.tool_call("search", Some("sess-demo"), Duration::from_millis(9), None);
    exporter.session_event("sess-demo", "created");

    // The buffer holds whatever the triggers have not drained yet
    println!("💾 Flushing buffered records...");
    logger.flush();
    exporter.shutdown();

    println!("✨ Example completed successfully!");
    println!("📁 Check './example_logs/' directory for log files");

    Ok(())
}
