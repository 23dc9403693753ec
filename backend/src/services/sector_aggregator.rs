use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};

use crate::models::{EnrichedHolding, SectorSummary};

/// Group holdings by exact sector name and total each group.
///
/// Groups appear in order of their sector's first occurrence. Holdings
/// without a live price add to `total_investment` only; their missing
/// present value and gain/loss are skipped rather than treated as zero.
/// Callers decide which holdings to pass in.
pub fn summarize(enriched: &[EnrichedHolding]) -> Vec<SectorSummary> {
    let mut summaries: Vec<SectorSummary> = Vec::new();
    let mut index_by_sector: HashMap<&str, usize> = HashMap::new();

    for holding in enriched {
        let sector = holding.holding.sector.as_str();

        let idx = *index_by_sector.entry(sector).or_insert_with(|| {
            summaries.push(SectorSummary {
                sector: sector.to_string(),
                total_investment: BigDecimal::zero(),
                total_present_value: BigDecimal::zero(),
                total_gain_loss: BigDecimal::zero(),
                holdings: Vec::new(),
            });
            summaries.len() - 1
        });

        let summary = &mut summaries[idx];
        summary.total_investment += &holding.investment;
        if let Some(value) = &holding.present_value {
            summary.total_present_value += value;
        }
        if let Some(gain) = &holding.gain_loss {
            summary.total_gain_loss += gain;
        }
        summary.holdings.push(holding.clone());
    }

    summaries
}
