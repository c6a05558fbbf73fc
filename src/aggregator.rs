use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::ProductRecord;
use crate::price::parse_price_decimal;

/// Merges per-source results into one ranking.
///
/// Records are taken in arrival order, stamped with their source key, sorted
/// by ascending `price_value` (stable, so equal prices keep arrival order) and
/// cut to `k`. No records gives an empty ranking.
pub fn aggregate<I, S>(results_by_source: I, k: usize) -> Vec<ProductRecord>
where
    I: IntoIterator<Item = (S, Vec<ProductRecord>)>,
    S: AsRef<str>,
{
    let mut all: Vec<ProductRecord> = results_by_source
        .into_iter()
        .flat_map(|(source, records)| {
            let source = source.as_ref().to_string();
            records.into_iter().map(move |mut record| {
                record.source = source.clone();
                record
            })
        })
        .collect();

    all.sort_by(|a, b| a.price_value.total_cmp(&b.price_value));
    all.truncate(k);
    all
}

/// Price spread over the priced records of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummary {
    pub cheapest: ProductRecord,
    pub most_expensive: ProductRecord,
    pub average: f64,
    pub priced_count: usize,
}

impl PriceSummary {
    /// `None` when no record carries a price.
    pub fn from_records(records: &[ProductRecord]) -> Option<Self> {
        let priced: Vec<&ProductRecord> = records.iter().filter(|r| r.is_priced()).collect();

        let cheapest = priced
            .iter()
            .min_by(|a, b| a.price_value.total_cmp(&b.price_value))?;
        let most_expensive = priced
            .iter()
            .max_by(|a, b| a.price_value.total_cmp(&b.price_value))?;
        let average = priced.iter().map(|r| r.price_value).sum::<f64>() / priced.len() as f64;

        Some(Self {
            cheapest: (*cheapest).clone(),
            most_expensive: (*most_expensive).clone(),
            average,
            priced_count: priced.len(),
        })
    }

    /// Exact difference between the dearest and the cheapest displayed price.
    pub fn savings(&self) -> Option<Decimal> {
        let worst = parse_price_decimal(&self.most_expensive.price)?;
        let best = parse_price_decimal(&self.cheapest.price)?;
        Some(worst - best)
    }

    pub fn savings_percentage(&self) -> Option<Decimal> {
        let worst = parse_price_decimal(&self.most_expensive.price)?;
        if worst.is_zero() {
            return None;
        }
        Some((self.savings()? / worst * Decimal::ONE_HUNDRED).round_dp(2))
    }
}
