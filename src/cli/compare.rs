use super::ui;
use crate::core::{ComparisonResult, ConversionRequest, RateComparator};
use anyhow::Result;
use comfy_table::Cell;
use tokio_util::sync::CancellationToken;

impl ComparisonResult {
    pub fn display_as_table(&self, request: &ConversionRequest) -> String {
        let target = request.primary_target().unwrap_or_default();

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("#"),
            ui::header_cell("Provider"),
            ui::header_cell(&format!("Amount ({target})")),
            ui::header_cell("Latency (ms)"),
        ]);

        // Offers are listed in arrival order; only the first best offer is highlighted.
        let mut best_marked = false;
        for (i, offer) in self.all_offers.iter().enumerate() {
            let is_best = !best_marked && offer == &self.best_offer;
            best_marked |= is_best;

            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(&offer.provider_label),
                ui::amount_cell(offer.converted_rate.to_string(), is_best),
                ui::amount_cell(offer.latency_ms.to_string(), false),
            ]);
        }

        let mut output = format!(
            "{} {} {} -> {}\n\n",
            ui::style_text("Conversion:", ui::StyleType::Title),
            request.amount,
            request.source(),
            target
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\nBest offer: {} from {} {}",
            ui::style_text(
                &format!("{} {target}", self.best_offer.converted_rate),
                ui::StyleType::BestValue
            ),
            self.best_offer.provider_label,
            ui::style_text(
                &format!("({} offers)", self.all_offers.len()),
                ui::StyleType::Subtle
            ),
        ));

        output
    }
}

pub async fn run(
    comparator: &RateComparator,
    request: &ConversionRequest,
    cancel: &CancellationToken,
) -> Result<()> {
    let pb = ui::new_spinner(format!(
        "Querying {} providers...",
        comparator.provider_names().len()
    ));
    let result = comparator.compare(request, cancel).await;
    pb.finish_and_clear();

    println!("{}", result?.display_as_table(request));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Offer;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_display_as_table() {
        let offers = vec![
            Offer {
                provider_label: "Alpha".to_string(),
                converted_rate: Decimal::from_str("90.12345").unwrap(),
                latency_ms: 120,
            },
            Offer {
                provider_label: "Beta".to_string(),
                converted_rate: Decimal::from_str("95.5").unwrap(),
                latency_ms: 80,
            },
        ];
        let result = ComparisonResult::from_offers(offers).unwrap();
        let request = ConversionRequest::new("usd", "eur", Decimal::from(100));

        let output = result.display_as_table(&request);

        assert!(output.contains("Alpha"));
        assert!(output.contains("90.12345"));
        assert!(output.contains("Amount (EUR)"));
        assert!(output.contains("Best offer"));
        assert!(output.contains("Beta"));
        assert!(output.contains("(2 offers)"));
    }
}
