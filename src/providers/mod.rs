pub mod currency_freaks;
pub mod fixer;
pub mod free_currency;
pub mod util;

use crate::core::QuoteProvider;
use crate::core::config::ProvidersConfig;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// Creates one provider for every upstream present in the configuration.
pub fn build_providers(config: &ProvidersConfig) -> Result<Vec<Arc<dyn QuoteProvider>>> {
    let mut providers: Vec<Arc<dyn QuoteProvider>> = Vec::new();

    if let Some(c) = &config.freecurrency {
        providers.push(Arc::new(free_currency::FreeCurrencyProvider::new(c)?));
    }
    if let Some(c) = &config.currencyfreaks {
        providers.push(Arc::new(currency_freaks::CurrencyFreaksProvider::new(c)?));
    }
    if let Some(c) = &config.fixer {
        providers.push(Arc::new(fixer::FixerProvider::new(c)?));
    }

    debug!(count = providers.len(), "Registered quote providers");
    Ok(providers)
}
