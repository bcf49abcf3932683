//! Concurrent rate comparison across quote providers
//!
//! A comparison dispatches one request to every registered provider at once, collects the
//! answers in the order they complete, and stops early on a deadline or on the first fault.

use super::exchange::{ComparisonResult, ConversionRequest, Offer};
use super::provider::QuoteProvider;
use anyhow::anyhow;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, instrument, warn};

/// Upper bound on how long a comparison waits for its providers.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error("no offers were received within {deadline:?}")]
    NoOffersAvailable { deadline: Duration },

    #[error("internal error while querying {provider}: {message}")]
    ProviderFault { provider: String, message: String },
}

impl CompareError {
    /// Stable machine readable code for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CompareError::InvalidInput(_) => "INVALID_INPUT",
            CompareError::NoOffersAvailable { .. } => "NO_OFFERS",
            CompareError::ProviderFault { .. } => "PROVIDER_FAULT",
        }
    }
}

type ProviderOutcome = (String, anyhow::Result<Option<Offer>>);

pub struct RateComparator {
    providers: Vec<Arc<dyn QuoteProvider>>,
    deadline: Duration,
}

impl RateComparator {
    pub fn new(providers: Vec<Arc<dyn QuoteProvider>>) -> Self {
        Self {
            providers,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Queries every provider concurrently and returns the best offer with all offers received.
    ///
    /// `cancel` is the caller's signal. Providers receive a child of it that is also cancelled
    /// when the deadline elapses or a provider faults.
    #[instrument(skip_all, fields(from = %request.from, to = %request.to, amount = %request.amount))]
    pub async fn compare(
        &self,
        request: &ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<ComparisonResult, CompareError> {
        if let Err(e) = request.validate() {
            warn!(error = %e, "Rejected conversion request");
            return Err(e);
        }

        let batch = cancel.child_token();
        let shared_request = Arc::new(request.clone());

        info!(
            providers = self.providers.len(),
            deadline_secs = self.deadline.as_secs_f64(),
            "Dispatching conversion request"
        );

        let mut tasks: JoinSet<ProviderOutcome> = JoinSet::new();
        let mut task_names = HashMap::with_capacity(self.providers.len());
        for provider in &self.providers {
            debug!(provider = provider.name(), "Querying provider");
            let provider = Arc::clone(provider);
            let request = Arc::clone(&shared_request);
            let batch = batch.clone();
            let name = provider.name().to_string();
            let handle = tasks.spawn(
                async move {
                    let name = provider.name().to_string();
                    let result = AssertUnwindSafe(provider.try_get_quote(&request, &batch))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| {
                            Err(anyhow!("provider panicked: {}", panic_message(&*panic)))
                        });
                    (name, result)
                }
                .in_current_span(),
            );
            task_names.insert(handle.id(), name);
        }

        let deadline = tokio::time::sleep(self.deadline);
        tokio::pin!(deadline);

        let mut offers = Vec::with_capacity(self.providers.len());
        loop {
            let joined = tokio::select! {
                joined = tasks.join_next() => joined,
                () = &mut deadline => {
                    warn!(
                        pending = tasks.len(),
                        collected = offers.len(),
                        "Deadline elapsed, abandoning pending providers"
                    );
                    batch.cancel();
                    break;
                }
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((name, Ok(Some(offer)))) => {
                    info!(
                        provider = %name,
                        rate = %offer.converted_rate,
                        latency_ms = offer.latency_ms,
                        "Offer received"
                    );
                    offers.push(offer);
                }
                Ok((name, Ok(None))) => {
                    warn!(provider = %name, "Provider returned no offer");
                }
                Ok((name, Err(e))) => {
                    error!(provider = %name, error = ?e, "Provider failed");
                    batch.cancel();
                    return Err(CompareError::ProviderFault {
                        provider: name,
                        message: format!("{e:#}"),
                    });
                }
                Err(e) => {
                    batch.cancel();
                    return Err(join_fault(&task_names, e));
                }
            }
        }

        match ComparisonResult::from_offers(offers) {
            Some(result) => {
                info!(
                    provider = %result.best_offer.provider_label,
                    rate = %result.best_offer.converted_rate,
                    offers = result.all_offers.len(),
                    "Best offer selected"
                );
                Ok(result)
            }
            None => {
                warn!(
                    deadline_secs = self.deadline.as_secs_f64(),
                    "No offers received"
                );
                Err(CompareError::NoOffersAvailable {
                    deadline: self.deadline,
                })
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Turns a task that never produced an outcome into a fault attributed to its provider.
fn join_fault(task_names: &HashMap<task::Id, String>, err: JoinError) -> CompareError {
    let provider = task_names
        .get(&err.id())
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());
    error!(provider = %provider, error = %err, "Provider task did not complete");
    CompareError::ProviderFault {
        provider,
        message: err.to_string(),
    }
}
