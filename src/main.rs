//! NRDOT+ MVP entry point: loads configuration, wires a [`Pipeline`], and runs it
//! with a demo [`Exporter`] until interrupted.
//!
//! The real OTLP/Prometheus exporters, receivers and health endpoints are external
//! collaborators outside this crate's scope; [`StdoutExporter`] stands in for them so
//! the pipeline is runnable end-to-end without a live upstream.

use std::{env, sync::Arc};

use async_trait::async_trait;
use nrdot_config::Config;
use nrdot_pipeline::{ExportOutcome, Exporter, Pipeline};
use nrdot_types::Record;
use tracing::info;

/// Writes each drained batch's size to stdout and always reports success. A
/// placeholder for the out-of-scope OTLP exporter.
struct StdoutExporter;

#[async_trait]
impl Exporter for StdoutExporter {
    async fn send(&self, batch: Vec<Record>) -> ExportOutcome {
        info!(batch_len = batch.len(), "exported batch");
        ExportOutcome::Ok
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let config = match env::args().nth(1) {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };

    let pipeline = Arc::new(Pipeline::new(&config, Arc::new(StdoutExporter))?);
    let handle = pipeline.run();

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    pipeline.shutdown();
    handle.await?;

    Ok(())
}
