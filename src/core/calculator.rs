//! Closed-form mortgage arithmetic: annuity payment, LTV, DSTI, amortization and APR.

use crate::domain::model::{
    AffordabilityReport, FeeSchedule, LimitStatus, RiskLimits, ScheduleRow, Verdict, WizardState,
    YearSummary,
};

const RATE_EPSILON: f64 = 1e-12;

fn monthly_rate(annual_rate_pct: f64) -> f64 {
    annual_rate_pct / 12.0 / 100.0
}

/// Standard annuity payment. Zero principal or zero term yields 0, zero rate
/// spreads the principal evenly.
pub fn monthly_payment(principal: f64, annual_rate_pct: f64, term_years: u32) -> f64 {
    if principal <= 0.0 || term_years == 0 {
        return 0.0;
    }
    let n = (term_years * 12) as i32;
    let i = monthly_rate(annual_rate_pct);
    if i.abs() < RATE_EPSILON {
        return principal / n as f64;
    }
    principal * i / (1.0 - (1.0 + i).powi(-n))
}

/// Inverse of [`monthly_payment`]: the principal a given payment can service.
pub fn principal_for_payment(payment: f64, annual_rate_pct: f64, term_years: u32) -> f64 {
    if payment <= 0.0 || term_years == 0 {
        return 0.0;
    }
    let n = (term_years * 12) as i32;
    let i = monthly_rate(annual_rate_pct);
    if i.abs() < RATE_EPSILON {
        return payment * n as f64;
    }
    payment * (1.0 - (1.0 + i).powi(-n)) / i
}

pub fn ltv(loan: f64, property_value: f64) -> f64 {
    if property_value <= 0.0 {
        return 0.0;
    }
    loan / property_value
}

/// 月負債 / 月收入；收入為零時永遠超標
pub fn dsti(payment: f64, liabilities: f64, income: f64) -> f64 {
    if income <= 0.0 {
        return f64::INFINITY;
    }
    (payment + liabilities) / income
}

pub fn limit_status(value: f64, warning: f64, max: f64) -> LimitStatus {
    if value <= warning {
        LimitStatus::Ok
    } else if value <= max {
        LimitStatus::Warning
    } else {
        LimitStatus::Exceeded
    }
}

pub fn assess(state: &WizardState, annual_rate_pct: f64, limits: &RiskLimits) -> AffordabilityReport {
    let loan_amount = state.loan_amount();
    let payment = monthly_payment(loan_amount, annual_rate_pct, state.term_years);
    let ltv_value = ltv(loan_amount, state.property_value);
    let dsti_value = dsti(payment, state.monthly_liabilities, state.monthly_income);

    let ltv_status = limit_status(ltv_value, limits.ltv_warning, limits.max_ltv);
    let dsti_status = limit_status(dsti_value, limits.dsti_warning, limits.max_dsti);

    let verdict = match (ltv_status, dsti_status) {
        (LimitStatus::Exceeded, _) | (_, LimitStatus::Exceeded) => Verdict::Rejected,
        (LimitStatus::Warning, _) | (_, LimitStatus::Warning) => Verdict::Borderline,
        _ => Verdict::Approvable,
    };

    let max_loan = max_loan(state, annual_rate_pct, limits);

    AffordabilityReport {
        loan_amount,
        rate: annual_rate_pct,
        monthly_payment: payment,
        ltv: ltv_value,
        dsti: dsti_value,
        ltv_status,
        dsti_status,
        verdict,
        max_loan,
        max_property_price: max_loan + state.own_resources,
    }
}

/// 同時受 DSTI 與 LTV 上限約束的最大貸款額
pub fn max_loan(state: &WizardState, annual_rate_pct: f64, limits: &RiskLimits) -> f64 {
    let capacity = (limits.max_dsti * state.monthly_income - state.monthly_liabilities).max(0.0);
    let by_dsti = principal_for_payment(capacity, annual_rate_pct, state.term_years);

    let by_ltv = if limits.max_ltv >= 1.0 {
        f64::INFINITY
    } else {
        state.own_resources * limits.max_ltv / (1.0 - limits.max_ltv)
    };

    by_dsti.min(by_ltv)
}

pub fn amortization_schedule(principal: f64, annual_rate_pct: f64, term_years: u32) -> Vec<ScheduleRow> {
    let payment = monthly_payment(principal, annual_rate_pct, term_years);
    if payment <= 0.0 {
        return Vec::new();
    }

    let months = term_years * 12;
    let i = monthly_rate(annual_rate_pct);
    let mut balance = principal;
    let mut rows = Vec::with_capacity(months as usize);

    for month in 1..=months {
        let interest = balance * i;
        let (payment, principal_part) = if month == months {
            (interest + balance, balance)
        } else {
            (payment, payment - interest)
        };
        balance = if month == months {
            0.0
        } else {
            (balance - principal_part).max(0.0)
        };

        rows.push(ScheduleRow {
            month,
            payment,
            interest,
            principal: principal_part,
            balance,
        });
    }

    rows
}

pub fn yearly_summary(rows: &[ScheduleRow]) -> Vec<YearSummary> {
    let mut years: Vec<YearSummary> = Vec::new();

    for row in rows {
        let year = (row.month - 1) / 12 + 1;
        match years.last_mut() {
            Some(summary) if summary.year == year => {
                summary.paid += row.payment;
                summary.interest += row.interest;
                summary.principal += row.principal;
                summary.balance = row.balance;
            }
            _ => years.push(YearSummary {
                year,
                paid: row.payment,
                interest: row.interest,
                principal: row.principal,
                balance: row.balance,
            }),
        }
    }

    years
}

/// Everything paid over the whole term: instalments, upfront fees and account fees.
pub fn total_cost(principal: f64, annual_rate_pct: f64, term_years: u32, fees: &FeeSchedule) -> f64 {
    let months = (term_years * 12) as f64;
    monthly_payment(principal, annual_rate_pct, term_years) * months
        + fees.upfront()
        + fees.monthly_account_fee * months
}

/// Effective annual rate in percent including fees (RPSN).
///
/// Solves the monthly IRR of `principal - upfront fees` against
/// `payment + account fee` by bisection, then annualises it.
pub fn effective_annual_rate(
    principal: f64,
    annual_rate_pct: f64,
    term_years: u32,
    fees: &FeeSchedule,
) -> f64 {
    let months = term_years * 12;
    let net = principal - fees.upfront();
    if months == 0 || net <= 0.0 {
        return 0.0;
    }

    let outflow = monthly_payment(principal, annual_rate_pct, term_years) + fees.monthly_account_fee;
    let present_value = |r: f64| -> f64 {
        if r.abs() < RATE_EPSILON {
            outflow * months as f64
        } else {
            outflow * (1.0 - (1.0 + r).powi(-(months as i32))) / r
        }
    };

    if present_value(0.0) <= net {
        return 0.0;
    }

    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    for _ in 0..200 {
        let mid = (lo + hi) / 2.0;
        if present_value(mid) > net {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    ((1.0 + (lo + hi) / 2.0).powi(12) - 1.0) * 100.0
}
