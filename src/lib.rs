pub mod api;
pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::{ConversionRequest, RateComparator};
use anyhow::Result;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub enum AppCommand {
    Compare {
        from: String,
        to: String,
        value: Decimal,
    },
    Serve {
        bind: Option<String>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let comparator = build_comparator(&config)?;
    let cancel = cancel_on_ctrl_c();

    match command {
        AppCommand::Compare { from, to, value } => {
            let request = ConversionRequest::new(from, to, value);
            cli::compare::run(&comparator, &request, &cancel).await
        }
        AppCommand::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            api::serve(comparator, &bind, cancel).await
        }
    }
}

pub fn build_comparator(config: &AppConfig) -> Result<RateComparator> {
    let providers = providers::build_providers(&config.providers)?;
    if providers.is_empty() {
        warn!("No quote providers configured");
    }
    let comparator = RateComparator::new(providers).with_deadline(config.deadline());
    info!(
        providers = ?comparator.provider_names(),
        deadline_secs = comparator.deadline().as_secs_f64(),
        "Rate comparator ready"
    );
    Ok(comparator)
}

/// Returns a token that is cancelled on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            trigger.cancel();
        }
    });
    cancel
}
