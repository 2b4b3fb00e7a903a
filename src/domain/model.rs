use serde::{Deserialize, Serialize};
use std::fmt;

/// 貸款目的
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Purchase,
    Construction,
    Refinance,
    Reconstruction,
}

impl Intent {
    pub const ALL: [Intent; 4] = [
        Intent::Purchase,
        Intent::Construction,
        Intent::Refinance,
        Intent::Reconstruction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Purchase => "purchase",
            Intent::Construction => "construction",
            Intent::Refinance => "refinance",
            Intent::Reconstruction => "reconstruction",
        }
    }

    /// Lenient parse of free text, accepts Czech and English wording.
    pub fn parse(text: &str) -> Option<Self> {
        let lowered = text.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }
        let matches = |keys: &[&str]| keys.iter().any(|k| lowered.contains(k));

        if matches(&["refinan", "refix"]) {
            Some(Intent::Refinance)
        } else if matches(&["rekonstruk", "reconstruct", "renovat", "modernizace"]) {
            Some(Intent::Reconstruction)
        } else if matches(&["stavb", "výstavb", "vystavb", "construct", "build"]) {
            Some(Intent::Construction)
        } else if matches(&["koup", "nákup", "nakup", "purchase", "buy"]) {
            Some(Intent::Purchase)
        } else {
            None
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_FIXATION_YEARS: u32 = 5;
pub const DEFAULT_TERM_YEARS: u32 = 30;

/// 精靈的平面狀態，所有金額皆為 CZK
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub intent: Option<Intent>,
    pub property_value: f64,
    pub own_resources: f64,
    pub monthly_income: f64,
    pub monthly_liabilities: f64,
    pub fixation_years: u32,
    pub term_years: u32,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            intent: None,
            property_value: 0.0,
            own_resources: 0.0,
            monthly_income: 0.0,
            monthly_liabilities: 0.0,
            fixation_years: DEFAULT_FIXATION_YEARS,
            term_years: DEFAULT_TERM_YEARS,
        }
    }
}

impl WizardState {
    pub fn loan_amount(&self) -> f64 {
        (self.property_value - self.own_resources).max(0.0)
    }

    pub fn ltv(&self) -> f64 {
        crate::core::calculator::ltv(self.loan_amount(), self.property_value)
    }
}

/// Partially known parameters collected by the assistant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanParameters {
    pub intent: Option<Intent>,
    pub property_value: Option<f64>,
    pub own_resources: Option<f64>,
    pub monthly_income: Option<f64>,
    pub monthly_liabilities: Option<f64>,
    pub fixation_years: Option<u32>,
    pub term_years: Option<u32>,
}

impl LoanParameters {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.intent.is_none() {
            missing.push("intent");
        }
        if self.property_value.is_none() {
            missing.push("property_value");
        }
        if self.own_resources.is_none() {
            missing.push("own_resources");
        }
        if self.monthly_income.is_none() {
            missing.push("monthly_income");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// 以 `other` 中存在的欄位覆寫，回傳被更新的欄位名稱
    pub fn merge(&mut self, other: &LoanParameters) -> Vec<&'static str> {
        let mut updated = Vec::new();

        macro_rules! take {
            ($field:ident) => {
                if let Some(value) = other.$field {
                    if self.$field != Some(value) {
                        updated.push(stringify!($field));
                    }
                    self.$field = Some(value);
                }
            };
        }

        take!(intent);
        take!(property_value);
        take!(own_resources);
        take!(monthly_income);
        take!(monthly_liabilities);
        take!(fixation_years);
        take!(term_years);

        updated
    }

    pub fn to_state(&self) -> Option<WizardState> {
        Some(WizardState {
            intent: Some(self.intent?),
            property_value: self.property_value?,
            own_resources: self.own_resources?,
            monthly_income: self.monthly_income?,
            monthly_liabilities: self.monthly_liabilities.unwrap_or(0.0),
            fixation_years: self.fixation_years.unwrap_or(DEFAULT_FIXATION_YEARS),
            term_years: self.term_years.unwrap_or(DEFAULT_TERM_YEARS),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default)]
    pub processing_fee: f64,
    #[serde(default)]
    pub valuation_fee: f64,
    #[serde(default)]
    pub monthly_account_fee: f64,
}

impl FeeSchedule {
    pub fn upfront(&self) -> f64 {
        self.processing_fee + self.valuation_fee
    }
}

/// One fixation row of a bank's rate table.
///
/// `band_rates[i]` is the rate for [`LTV_BANDS`]`[i]`; a shorter list means the
/// bank does not lend in the remaining bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRow {
    pub fixation_years: u32,
    pub band_rates: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankProfile {
    pub id: String,
    pub name: String,
    pub max_ltv: f64,
    pub rates: Vec<RateRow>,
    #[serde(default)]
    pub fees: FeeSchedule,
}

impl BankProfile {
    pub fn rate_row(&self, fixation_years: u32) -> Option<&RateRow> {
        self.rates.iter().find(|row| row.fixation_years == fixation_years)
    }
}

pub const FIXATION_PERIODS: [u32; 5] = [1, 3, 5, 7, 10];

/// Inclusive upper bounds of the LTV bands.
pub const LTV_BANDS: [f64; 4] = [0.60, 0.70, 0.80, 0.90];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseRate {
    pub fixation_years: u32,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRates {
    pub base_rates: Vec<BaseRate>,
    pub ltv_pivot: f64,
    /// 每 1.0 LTV 超出 pivot 的加碼 (百分點)
    pub ltv_slope: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    pub max_ltv: f64,
    pub ltv_warning: f64,
    pub max_dsti: f64,
    pub dsti_warning: f64,
    pub min_term: u32,
    pub max_term: u32,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_ltv: 0.90,
            ltv_warning: 0.80,
            max_dsti: 0.50,
            dsti_warning: 0.45,
            min_term: 5,
            max_term: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offer {
    pub bank_id: String,
    pub bank_name: String,
    pub rate: f64,
    pub monthly_payment: f64,
    pub fees: FeeSchedule,
    pub total_cost: f64,
    pub apr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitStatus {
    Ok,
    Warning,
    Exceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approvable,
    Borderline,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffordabilityReport {
    pub loan_amount: f64,
    pub rate: f64,
    pub monthly_payment: f64,
    pub ltv: f64,
    pub dsti: f64,
    pub ltv_status: LimitStatus,
    pub dsti_status: LimitStatus,
    pub verdict: Verdict,
    pub max_loan: f64,
    pub max_property_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduleRow {
    pub month: u32,
    pub payment: f64,
    pub interest: f64,
    pub principal: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: u32,
    pub paid: f64,
    pub interest: f64,
    pub principal: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// 送往 CRM 的潛在客戶資料
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lead {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub note: Option<String>,
    pub state: Option<WizardState>,
    pub selected_offer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_parse() {
        assert_eq!(Intent::parse("Chci koupit byt"), Some(Intent::Purchase));
        assert_eq!(Intent::parse("refinancování hypotéky"), Some(Intent::Refinance));
        assert_eq!(Intent::parse("výstavba domu"), Some(Intent::Construction));
        assert_eq!(Intent::parse("rekonstrukce"), Some(Intent::Reconstruction));
        assert_eq!(Intent::parse("  "), None);
        assert_eq!(Intent::parse("something else"), None);
    }

    #[test]
    fn test_loan_amount_saturates() {
        let state = WizardState {
            property_value: 1_000_000.0,
            own_resources: 1_500_000.0,
            ..Default::default()
        };
        assert_eq!(state.loan_amount(), 0.0);
        assert_eq!(state.ltv(), 0.0);
    }

    #[test]
    fn test_parameters_merge_reports_changes() {
        let mut params = LoanParameters {
            property_value: Some(5_000_000.0),
            ..Default::default()
        };
        let update = LoanParameters {
            property_value: Some(5_000_000.0),
            monthly_income: Some(80_000.0),
            ..Default::default()
        };

        let updated = params.merge(&update);
        assert_eq!(updated, vec!["monthly_income"]);
        assert_eq!(params.missing_fields(), vec!["intent", "own_resources"]);
        assert!(params.to_state().is_none());
    }

    #[test]
    fn test_parameters_to_state_defaults() {
        let params = LoanParameters {
            intent: Some(Intent::Purchase),
            property_value: Some(4_000_000.0),
            own_resources: Some(800_000.0),
            monthly_income: Some(70_000.0),
            ..Default::default()
        };
        let state = params.to_state().unwrap();
        assert_eq!(state.fixation_years, DEFAULT_FIXATION_YEARS);
        assert_eq!(state.term_years, DEFAULT_TERM_YEARS);
        assert_eq!(state.monthly_liabilities, 0.0);
    }
}
