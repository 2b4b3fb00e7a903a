use crate::core::calculator;
use crate::domain::model::{BankProfile, MarketRates, Offer, WizardState, LTV_BANDS};

// 浮點計算的 LTV 可能略大於邊界值
const BAND_EPSILON: f64 = 1e-9;

/// Index into [`LTV_BANDS`] of the smallest band whose bound covers `ltv`.
pub fn ltv_band(ltv: f64) -> Option<usize> {
    LTV_BANDS.iter().position(|bound| ltv <= bound + BAND_EPSILON)
}

/// Market estimate with the linear LTV adjustment
/// `base + slope * max(ltv - pivot, 0)`.
pub fn market_rate(market: &MarketRates, fixation_years: u32, ltv: f64) -> Option<f64> {
    let base = market
        .base_rates
        .iter()
        .find(|b| b.fixation_years == fixation_years)?
        .rate;
    Some(base + market.ltv_slope * (ltv - market.ltv_pivot).max(0.0))
}

pub fn bank_rate(bank: &BankProfile, fixation_years: u32, ltv: f64) -> Option<f64> {
    if ltv > bank.max_ltv + BAND_EPSILON {
        return None;
    }
    let band = ltv_band(ltv)?;
    bank.rate_row(fixation_years)?.band_rates.get(band).copied()
}

/// Offers for `state`, cheapest rate first, at most `limit` entries.
pub fn best_offers(state: &WizardState, banks: &[BankProfile], limit: usize) -> Vec<Offer> {
    let loan = state.loan_amount();
    let ltv = state.ltv();

    let mut offers: Vec<Offer> = banks
        .iter()
        .filter_map(|bank| {
            let Some(rate) = bank_rate(bank, state.fixation_years, ltv) else {
                tracing::debug!(
                    "Skipping {}: no rate for fixation {}y at LTV {:.3}",
                    bank.id,
                    state.fixation_years,
                    ltv
                );
                return None;
            };
            Some(Offer {
                bank_id: bank.id.clone(),
                bank_name: bank.name.clone(),
                rate,
                monthly_payment: calculator::monthly_payment(loan, rate, state.term_years),
                fees: bank.fees.clone(),
                total_cost: calculator::total_cost(loan, rate, state.term_years, &bank.fees),
                apr: calculator::effective_annual_rate(loan, rate, state.term_years, &bank.fees),
            })
        })
        .collect();

    offers.sort_by(|a, b| {
        a.rate
            .total_cmp(&b.rate)
            .then(a.total_cost.total_cmp(&b.total_cost))
            .then_with(|| a.bank_id.cmp(&b.bank_id))
    });
    offers.truncate(limit);

    tracing::debug!("Found {} offers for loan {:.0} CZK", offers.len(), loan);
    offers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BaseRate, FeeSchedule, Intent, RateRow};

    fn bank(id: &str, max_ltv: f64, five_year: Vec<f64>, processing_fee: f64) -> BankProfile {
        BankProfile {
            id: id.to_string(),
            name: id.to_uppercase(),
            max_ltv,
            rates: vec![RateRow {
                fixation_years: 5,
                band_rates: five_year,
            }],
            fees: FeeSchedule {
                processing_fee,
                ..Default::default()
            },
        }
    }

    fn state(property_value: f64, own_resources: f64) -> WizardState {
        WizardState {
            intent: Some(Intent::Purchase),
            property_value,
            own_resources,
            monthly_income: 100_000.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_ltv_band_edges() {
        assert_eq!(ltv_band(0.0), Some(0));
        assert_eq!(ltv_band(0.60), Some(0));
        assert_eq!(ltv_band(0.6001), Some(1));
        assert_eq!(ltv_band(0.80), Some(2));
        assert_eq!(ltv_band(0.90), Some(3));
        assert_eq!(ltv_band(0.91), None);
    }

    #[test]
    fn test_market_rate_is_linear_above_pivot() {
        let market = MarketRates {
            base_rates: vec![BaseRate {
                fixation_years: 5,
                rate: 4.5,
            }],
            ltv_pivot: 0.6,
            ltv_slope: 2.0,
        };
        assert_eq!(market_rate(&market, 5, 0.5), Some(4.5));
        let at_ninety = market_rate(&market, 5, 0.9).unwrap();
        assert!((at_ninety - 5.1).abs() < 1e-9);
        assert_eq!(market_rate(&market, 3, 0.5), None);
    }

    #[test]
    fn test_best_offers_sorted_and_limited() {
        let banks = vec![
            bank("alpha", 0.9, vec![4.6, 4.7, 4.9, 5.3], 0.0),
            bank("beta", 0.9, vec![4.4, 4.5, 4.7, 5.1], 0.0),
            bank("gamma", 0.9, vec![4.5, 4.6, 4.8, 5.2], 0.0),
        ];

        let offers = best_offers(&state(5_000_000.0, 1_000_000.0), &banks, 2);
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].bank_id, "beta");
        assert_eq!(offers[0].rate, 4.7);
        assert_eq!(offers[1].bank_id, "gamma");
    }

    #[test]
    fn test_equal_rates_break_on_total_cost() {
        let banks = vec![
            bank("pricey", 0.9, vec![4.5], 20_000.0),
            bank("cheap", 0.9, vec![4.5], 0.0),
        ];
        let offers = best_offers(&state(5_000_000.0, 3_000_000.0), &banks, 5);
        assert_eq!(offers[0].bank_id, "cheap");
        assert!(offers[0].apr < offers[1].apr);
    }

    #[test]
    fn test_banks_filtered_by_ltv_and_band() {
        let banks = vec![
            bank("strict", 0.8, vec![4.2, 4.3, 4.4, 4.5], 0.0),
            bank("short_table", 0.9, vec![4.1, 4.2, 4.3], 0.0),
            bank("open", 0.9, vec![4.6, 4.7, 4.8, 5.0], 0.0),
        ];

        // LTV 0.9 留下 open 一家
        let offers = best_offers(&state(5_000_000.0, 500_000.0), &banks, 5);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].bank_id, "open");

        let none = best_offers(&state(5_000_000.0, 0.0), &banks, 5);
        assert!(none.is_empty());
    }

    #[test]
    fn test_missing_fixation_skips_bank() {
        let banks = vec![bank("alpha", 0.9, vec![4.6], 0.0)];
        let mut s = state(5_000_000.0, 3_000_000.0);
        s.fixation_years = 10;
        assert!(best_offers(&s, &banks, 5).is_empty());
    }
}
