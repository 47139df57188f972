// ███████╗██████╗ ███████╗██╗ ██████╗ ██╗  ██╗████████╗
// ██╔════╝██╔══██╗██╔════╝██║██╔════╝ ██║  ██║╚══██╔══╝
// █████╗  ██████╔╝█████╗  ██║██║  ███╗███████║   ██║
// ██╔══╝  ██╔══██╗██╔══╝  ██║██║   ██║██╔══██║   ██║
// ██║     ██║  ██║███████╗██║╚██████╔╝██║  ██║   ██║
// ╚═╝     ╚═╝  ╚═╝╚══════╝╚═╝ ╚═════╝ ╚═╝  ╚═╝   ╚═╝
//
// ███╗   ███╗ █████╗ ████████╗ ██████╗██╗  ██╗
// ████╗ ████║██╔══██╗╚══██╔══╝██╔════╝██║  ██║
// ██╔████╔██║███████║   ██║   ██║     ███████║
// ██║╚██╔╝██║██╔══██║   ██║   ██║     ██╔══██║
// ██║ ╚═╝ ██║██║  ██║   ██║   ╚██████╗██║  ██║
// ╚═╝     ╚═╝╚═╝  ╚═╝   ╚═╝    ╚═════╝╚═╝  ╚═╝
//
// E N G I N E
//
// The most overkill freight order matcher ever conceived.
// Rust + Tokio + Crossbeam + Rayon + five million rows of government CSV
// All to hand a dashboard ten imaginary truckloads at a time.

mod config;
mod geo;
mod metadata;
mod metrics;
mod models;
mod normalizer;
mod pipeline;
mod server;

use std::sync::Arc;
use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn, error};
use tracing_subscriber::{self, EnvFilter, fmt};

use crate::config::EngineConfig;
use crate::metadata::MetadataCatalog;
use crate::metrics::MetricsCollector;
use crate::normalizer::{FlowFilter, FlowTable};
use crate::pipeline::MatchPipeline;

fn print_banner() {
    let banner = r#"

    ╔══════════════════════════════════════════════════════════════════╗
    ║                                                                  ║
    ║      ███████╗██████╗ ███████╗██╗ ██████╗ ██╗  ██╗████████╗       ║
    ║      ██╔════╝██╔══██╗██╔════╝██║██╔════╝ ██║  ██║╚══██╔══╝       ║
    ║      █████╗  ██████╔╝█████╗  ██║██║  ███╗███████║   ██║          ║
    ║      ██╔══╝  ██╔══██╗██╔══╝  ██║██║   ██║██╔══██║   ██║          ║
    ║      ██║     ██║  ██║███████╗██║╚██████╔╝██║  ██║   ██║          ║
    ║      ╚═╝     ╚═╝  ╚═╝╚══════╝╚═╝ ╚═════╝ ╚═╝  ╚═╝   ╚═╝          ║
    ║                                                                  ║
    ║           ███╗   ███╗ █████╗ ████████╗ ██████╗██╗  ██╗           ║
    ║           ████╗ ████║██╔══██╗╚══██╔══╝██╔════╝██║  ██║           ║
    ║           ██╔████╔██║███████║   ██║   ██║     ███████║           ║
    ║           ██║╚██╔╝██║██╔══██║   ██║   ██║     ██╔══██║           ║
    ║           ██║ ╚═╝ ██║██║  ██║   ██║   ╚██████╗██║  ██║           ║
    ║           ╚═╝     ╚═╝╚═╝  ╚═╝   ╚═╝    ╚═════╝╚═╝  ╚═╝           ║
    ║                                                                  ║
    ║             ⚡ COMMODITY FLOW ORDER MATCHING ENGINE ⚡             ║
    ║                                                                  ║
    ║   Dataset:   FAF 5.5.1 commodity flows, four years deep          ║
    ║   Fleet:     Small | Medium | Large (all imaginary)              ║
    ║   Economics: diesel-only cost model, anchored in New York        ║
    ║   Pipeline:  Sample -> Price -> Star -> Filter                   ║
    ║                                                                  ║
    ║      "If the profit isn't positive, the truck isn't real."       ║
    ║                                                                  ║
    ╚══════════════════════════════════════════════════════════════════╝

    "#;
    println!("{}", banner);
}

#[tokio::main(flavor = "multi_thread", worker_threads = 8)]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(true)
        .init();

    print_banner();

    info!("🚛 FREIGHT MATCH ENGINE initializing...");

    // Load configuration
    let config = Arc::new(EngineConfig::from_env());
    info!(
        "✅ Configuration loaded: flow_data={} cost_reference={}",
        config.flow_data_path, config.cost_reference_location
    );

    // Metadata first: three small lookup CSVs that turn opaque zone and
    // commodity codes into names a human can read.
    let catalog = MetadataCatalog::load(&config).context("failed to load metadata catalog")?;
    info!("✅ Metadata catalog online");

    // The big one. Streams the multi-gigabyte flow CSV through a bounded
    // channel in batches, normalizes it, and freezes the result. After
    // this line the table never changes again.
    let filter = FlowFilter {
        mode: config.filter_mode,
        trade_type: config.filter_trade_type,
    };
    let table = Arc::new(
        FlowTable::load(&config.flow_data_path, filter, config.batch_size, &catalog)
            .context("failed to load the flow dataset")?,
    );
    info!("✅ Flow table normalized and frozen: {} lanes", table.len());

    // Metrics collector
    let metrics_collector = Arc::new(MetricsCollector::new());
    info!("✅ Metrics collector initialized");

    // Assemble the pipeline. This validates the cost-reference hub, so a
    // bad FREIGHT_MATCH_COST_REFERENCE dies here, not mid-request.
    let pipeline = Arc::new(
        MatchPipeline::new(
            Arc::clone(&config),
            Arc::clone(&table),
            Arc::clone(&metrics_collector),
        )
        .context("failed to assemble the match pipeline")?,
    );
    info!("✅ Match pipeline assembled");

    // Shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ═══════════════════════════════════════════
    // SPAWN ORDER SERVER
    // ═══════════════════════════════════════════
    let server_pipeline = Arc::clone(&pipeline);
    let server_metrics = Arc::clone(&metrics_collector);
    let server_port = config.server_port;
    let mut server_shutdown = shutdown_rx.clone();
    let server_handle = tokio::spawn(async move {
        info!("📡 Order Server: ONLINE");
        server::run_http_server(
            server_pipeline,
            server_metrics,
            server_port,
            &mut server_shutdown,
        )
        .await;
        info!("📡 Order Server: OFFLINE");
    });

    info!("═══════════════════════════════════════════════════════");
    info!("  🟢 ALL SYSTEMS ONLINE - FREIGHT MATCH ENGINE ACTIVE");
    info!("  📊 {} flow lanes loaded, immutable until restart", table.len());
    info!("  📡 Orders at http://0.0.0.0:{}/api/available-orders", config.server_port);
    info!("  🩺 Health at /health, counters at /metrics");
    info!("  ⚡ Press Ctrl+C for graceful shutdown");
    info!("═══════════════════════════════════════════════════════");

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            warn!("🛑 Shutdown signal received!");
            let _ = shutdown_tx.send(true);
        }
        Err(err) => {
            error!("❌ Signal listener error: {}", err);
            let _ = shutdown_tx.send(true);
        }
    }

    info!("⏳ Waiting for tasks to complete (timeout: 10s)...");
    let _ = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        async {
            let _ = tokio::join!(server_handle);
        }
    ).await;

    info!("💀 FREIGHT MATCH ENGINE: OFFLINE");
    Ok(())
}
