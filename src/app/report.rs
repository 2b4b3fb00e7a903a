use crate::core::wizard::WizardSummary;
use crate::domain::model::{AffordabilityReport, LimitStatus, Offer, ScheduleRow, Verdict, YearSummary};
use crate::utils::error::{MortgageError, Result};
use serde::Serialize;

/// "4 000 000 Kč"
pub fn format_czk(value: f64) -> String {
    if !value.is_finite() {
        return "∞ Kč".to_string();
    }
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    let sign = if rounded < 0 { "-" } else { "" };
    format!("{}{} Kč", sign, grouped)
}

pub fn format_percent(ratio: f64) -> String {
    if ratio.is_finite() {
        format!("{:.1} %", ratio * 100.0)
    } else {
        "∞".to_string()
    }
}

fn status_icon(status: LimitStatus) -> &'static str {
    match status {
        LimitStatus::Ok => "✅",
        LimitStatus::Warning => "⚠️",
        LimitStatus::Exceeded => "❌",
    }
}

pub fn format_report(report: &AffordabilityReport) -> String {
    let verdict = match report.verdict {
        Verdict::Approvable => "✅ Approvable",
        Verdict::Borderline => "⚠️ Borderline",
        Verdict::Rejected => "❌ Rejected",
    };

    [
        format!("Loan amount:      {}", format_czk(report.loan_amount)),
        format!("Rate:             {:.2} %", report.rate),
        format!("Monthly payment:  {}", format_czk(report.monthly_payment)),
        format!("LTV:              {} {}", format_percent(report.ltv), status_icon(report.ltv_status)),
        format!("DSTI:             {} {}", format_percent(report.dsti), status_icon(report.dsti_status)),
        format!("Verdict:          {}", verdict),
        format!("Max loan:         {}", format_czk(report.max_loan)),
        format!("Max price:        {}", format_czk(report.max_property_price)),
    ]
    .join("\n")
}

pub fn format_offers(offers: &[Offer]) -> String {
    if offers.is_empty() {
        return "No bank offers match this LTV and fixation.".to_string();
    }

    let mut lines = vec![format!(
        "{:<3} {:<22} {:>7} {:>14} {:>7} {:>16}",
        "#", "Bank", "Rate", "Payment", "APR", "Total cost"
    )];
    for (i, offer) in offers.iter().enumerate() {
        lines.push(format!(
            "{:<3} {:<22} {:>6.2}% {:>14} {:>6.2}% {:>16}",
            i + 1,
            offer.bank_name,
            offer.rate,
            format_czk(offer.monthly_payment),
            offer.apr,
            format_czk(offer.total_cost)
        ));
    }
    lines.join("\n")
}

pub fn format_summary(summary: &WizardSummary) -> String {
    let mut out = format_report(&summary.report);
    if let Some(rate) = summary.market_rate {
        out.push_str(&format!("\nMarket estimate:  {:.2} %", rate));
    }
    out.push_str("\n\n");
    out.push_str(&format_offers(&summary.offers));
    out
}

pub fn format_yearly(years: &[YearSummary]) -> String {
    let mut lines = vec![format!(
        "{:>4} {:>16} {:>16} {:>16} {:>16}",
        "Year", "Paid", "Interest", "Principal", "Balance"
    )];
    for year in years {
        lines.push(format!(
            "{:>4} {:>16} {:>16} {:>16} {:>16}",
            year.year,
            format_czk(year.paid),
            format_czk(year.interest),
            format_czk(year.principal),
            format_czk(year.balance)
        ));
    }
    lines.join("\n")
}

pub fn format_monthly(rows: &[ScheduleRow]) -> String {
    let mut lines = vec![format!(
        "{:>5} {:>14} {:>14} {:>14} {:>16}",
        "Month", "Payment", "Interest", "Principal", "Balance"
    )];
    for row in rows {
        lines.push(format!(
            "{:>5} {:>14} {:>14} {:>14} {:>16}",
            row.month,
            format_czk(row.payment),
            format_czk(row.interest),
            format_czk(row.principal),
            format_czk(row.balance)
        ));
    }
    lines.join("\n")
}

pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| MortgageError::IoError(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calculator::amortization_schedule;

    #[test]
    fn test_format_czk_groups_thousands() {
        assert_eq!(format_czk(4_000_000.0), "4 000 000 Kč");
        assert_eq!(format_czk(999.6), "1 000 Kč");
        assert_eq!(format_czk(12.0), "12 Kč");
        assert_eq!(format_czk(-1_500.0), "-1 500 Kč");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.8), "80.0 %");
        assert_eq!(format_percent(f64::INFINITY), "∞");
    }

    #[test]
    fn test_schedule_csv_has_header_and_rows() {
        let rows = amortization_schedule(120_000.0, 0.0, 1);
        let csv = String::from_utf8(to_csv(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 13);
        assert_eq!(lines[0], "month,payment,interest,principal,balance");
        assert_eq!(lines[1], "1,10000.0,0.0,10000.0,110000.0");
    }

    #[test]
    fn test_empty_offers_message() {
        assert!(format_offers(&[]).contains("No bank offers"));
    }
}
