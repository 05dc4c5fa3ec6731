use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use reckon_core::ReconcileConfig;
use reckon_match::{ReconciledPair, Reconciler, RetailerDecoder};
use reckon_receipt::ReceiptCache;
use serde_json::json;
use tracing_subscriber::EnvFilter;

mod files;

use files::DataDir;

#[derive(Parser, Debug)]
#[command(name = "reckon", version, about = "Pair retailer e-receipts with bank transactions")]
struct Cli {
    /// TOML reconciliation settings
    config: PathBuf,

    /// Directory holding `retailer/`, `bank/` and `receipts/`
    data_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ReconcileConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let offset = config
        .retailer_offset()
        .context("retailer_utc_offset_minutes is out of range")?;

    let decoder = RetailerDecoder::new(offset, Utc::now().with_timezone(&offset));
    let data = DataDir::new(&cli.data_dir, decoder);
    let receipts = ReceiptCache::new(data.clone());

    tracing::info!(data_dir = %cli.data_dir.display(), "reconciling");
    let report = Reconciler::new(config)
        .run(&data, &data, &receipts)
        .context("reading retailer feed")?;

    let mut out = io::stdout().lock();
    for pair in &report.matched {
        writeln!(out, "{}", pair_line(pair))?;
    }
    Ok(())
}

fn pair_line(pair: &ReconciledPair) -> serde_json::Value {
    json!({
        "retailer_id": pair.retailer.id,
        "bank_id": pair.bank.id,
        "bank_time": pair.bank.timestamp.to_rfc3339(),
        "partner": pair.partner,
        "amount_paid": pair.receipt.amount_paid,
        "receipt": &*pair.receipt,
    })
}
