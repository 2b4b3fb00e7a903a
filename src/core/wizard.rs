use crate::config::rates_config::RatesConfig;
use crate::core::{calculator, offers};
use crate::domain::model::{
    AffordabilityReport, Intent, LoanParameters, Offer, RiskLimits, WizardState, FIXATION_PERIODS,
};
use crate::utils::error::{MortgageError, Result};
use crate::utils::validation::validate_amount;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    Intent,
    Property,
    Resources,
    Income,
    Summary,
}

impl WizardStep {
    pub const COUNT: usize = 5;

    pub fn index(&self) -> usize {
        match self {
            WizardStep::Intent => 1,
            WizardStep::Property => 2,
            WizardStep::Resources => 3,
            WizardStep::Income => 4,
            WizardStep::Summary => 5,
        }
    }

    fn next(self) -> Self {
        match self {
            WizardStep::Intent => WizardStep::Property,
            WizardStep::Property => WizardStep::Resources,
            WizardStep::Resources => WizardStep::Income,
            WizardStep::Income | WizardStep::Summary => WizardStep::Summary,
        }
    }

    fn previous(self) -> Self {
        match self {
            WizardStep::Intent | WizardStep::Property => WizardStep::Intent,
            WizardStep::Resources => WizardStep::Property,
            WizardStep::Income => WizardStep::Resources,
            WizardStep::Summary => WizardStep::Income,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepInput {
    Intent(Intent),
    Property { value: f64 },
    Resources { own: f64 },
    Income { income: f64, liabilities: f64 },
}

impl StepInput {
    fn step(&self) -> WizardStep {
        match self {
            StepInput::Intent(_) => WizardStep::Intent,
            StepInput::Property { .. } => WizardStep::Property,
            StepInput::Resources { .. } => WizardStep::Resources,
            StepInput::Income { .. } => WizardStep::Income,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WizardSummary {
    pub report: AffordabilityReport,
    pub offers: Vec<Offer>,
    pub market_rate: Option<f64>,
}

/// 五個步驟的線性精靈
#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    state: WizardState,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Intent,
            state: WizardState::default(),
        }
    }

    /// Pre-fills the wizard from parameters gathered elsewhere. Each value goes
    /// through the same checks as [`Wizard::submit`]; the wizard stops on the
    /// first step whose data is missing or rejected.
    pub fn resume(params: &LoanParameters, limits: &RiskLimits) -> Self {
        let mut wizard = Self::new();

        if let Some(fixation) = params.fixation_years {
            match check_terms(fixation, wizard.state.term_years, limits) {
                Ok(()) => wizard.state.fixation_years = fixation,
                Err(e) => tracing::debug!("Ignoring prefilled fixation: {}", e),
            }
        }
        if let Some(term) = params.term_years {
            match check_terms(wizard.state.fixation_years, term, limits) {
                Ok(()) => wizard.state.term_years = term,
                Err(e) => tracing::debug!("Ignoring prefilled term: {}", e),
            }
        }

        let inputs = [
            params.intent.map(StepInput::Intent),
            params.property_value.map(|value| StepInput::Property { value }),
            params.own_resources.map(|own| StepInput::Resources { own }),
            params.monthly_income.map(|income| StepInput::Income {
                income,
                liabilities: params.monthly_liabilities.unwrap_or(0.0),
            }),
        ];
        for input in inputs {
            let Some(input) = input else { break };
            if let Err(e) = wizard.submit(input) {
                tracing::debug!("Prefilled value rejected at {:?}: {}", wizard.step, e);
                break;
            }
        }

        wizard
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn progress(&self) -> (usize, usize) {
        (self.step.index(), WizardStep::COUNT)
    }

    pub fn is_complete(&self) -> bool {
        self.step == WizardStep::Summary
    }

    pub fn submit(&mut self, input: StepInput) -> Result<WizardStep> {
        if input.step() != self.step {
            return Err(MortgageError::InvalidStateError {
                message: format!(
                    "expected input for step {:?}, got {:?}",
                    self.step,
                    input.step()
                ),
            });
        }

        match input {
            StepInput::Intent(intent) => self.state.intent = Some(intent),
            StepInput::Property { value } => {
                validate_amount("property_value", value)?;
                if value == 0.0 {
                    return Err(MortgageError::validation(
                        "property_value",
                        "must be greater than zero",
                    ));
                }
                self.state.property_value = value;
            }
            StepInput::Resources { own } => {
                validate_amount("own_resources", own)?;
                if own > self.state.property_value {
                    return Err(MortgageError::validation(
                        "own_resources",
                        "cannot exceed the property value",
                    ));
                }
                self.state.own_resources = own;
            }
            StepInput::Income {
                income,
                liabilities,
            } => {
                validate_amount("monthly_income", income)?;
                validate_amount("monthly_liabilities", liabilities)?;
                self.state.monthly_income = income;
                self.state.monthly_liabilities = liabilities;
            }
        }

        self.step = self.step.next();
        tracing::debug!("Wizard advanced to {:?}", self.step);
        Ok(self.step)
    }

    pub fn back(&mut self) -> WizardStep {
        self.step = self.step.previous();
        self.step
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn choose(&mut self, fixation_years: u32, term_years: u32, config: &RatesConfig) -> Result<()> {
        check_terms(fixation_years, term_years, &config.limits)?;
        self.state.fixation_years = fixation_years;
        self.state.term_years = term_years;
        Ok(())
    }

    pub fn summary(&self, config: &RatesConfig) -> Result<WizardSummary> {
        if self.step != WizardStep::Summary {
            return Err(MortgageError::InvalidStateError {
                message: format!("summary is not available at step {:?}", self.step),
            });
        }
        summarize(&self.state, config)
    }
}

/// Fixation must be a supported period and the term within the configured limits.
pub fn check_terms(fixation_years: u32, term_years: u32, limits: &RiskLimits) -> Result<()> {
    if !FIXATION_PERIODS.contains(&fixation_years) {
        return Err(MortgageError::validation(
            "fixation_years",
            format!("supported periods are {:?}", FIXATION_PERIODS),
        ));
    }
    if term_years < limits.min_term || term_years > limits.max_term {
        return Err(MortgageError::validation(
            "term_years",
            format!("must be between {} and {}", limits.min_term, limits.max_term),
        ));
    }
    Ok(())
}

/// 報告以最佳報價的利率計算，沒有報價時退回市場估計利率
pub fn summarize(state: &WizardState, config: &RatesConfig) -> Result<WizardSummary> {
    let offers = offers::best_offers(state, &config.banks, config.offer_limit);
    let market_rate = offers::market_rate(&config.market, state.fixation_years, state.ltv());

    let rate = offers
        .first()
        .map(|offer| offer.rate)
        .or(market_rate)
        .ok_or_else(|| MortgageError::ConfigError {
            message: format!("no rate available for fixation {} years", state.fixation_years),
        })?;

    Ok(WizardSummary {
        report: calculator::assess(state, rate, &config.limits),
        offers,
        market_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Verdict;

    fn config() -> RatesConfig {
        RatesConfig::embedded().unwrap()
    }

    fn completed() -> Wizard {
        let mut wizard = Wizard::new();
        wizard.submit(StepInput::Intent(Intent::Purchase)).unwrap();
        wizard.submit(StepInput::Property { value: 6_000_000.0 }).unwrap();
        wizard.submit(StepInput::Resources { own: 1_500_000.0 }).unwrap();
        wizard
            .submit(StepInput::Income {
                income: 110_000.0,
                liabilities: 3_000.0,
            })
            .unwrap();
        wizard
    }

    #[test]
    fn test_linear_progression() {
        let wizard = completed();
        assert!(wizard.is_complete());
        assert_eq!(wizard.progress(), (5, 5));
        assert_eq!(wizard.state().loan_amount(), 4_500_000.0);
    }

    #[test]
    fn test_out_of_order_input_rejected() {
        let mut wizard = Wizard::new();
        let err = wizard
            .submit(StepInput::Property { value: 1_000_000.0 })
            .unwrap_err();
        assert!(matches!(err, MortgageError::InvalidStateError { .. }));
        assert_eq!(wizard.step(), WizardStep::Intent);
    }

    #[test]
    fn test_invalid_amounts_do_not_advance() {
        let mut wizard = Wizard::new();
        wizard.submit(StepInput::Intent(Intent::Refinance)).unwrap();
        assert!(wizard.submit(StepInput::Property { value: -5.0 }).is_err());
        assert!(wizard.submit(StepInput::Property { value: 0.0 }).is_err());
        wizard.submit(StepInput::Property { value: 2_000_000.0 }).unwrap();
        assert!(wizard.submit(StepInput::Resources { own: 2_500_000.0 }).is_err());
        assert_eq!(wizard.step(), WizardStep::Resources);
    }

    #[test]
    fn test_back_keeps_data_and_stops_at_first_step() {
        let mut wizard = completed();
        assert_eq!(wizard.back(), WizardStep::Income);
        assert_eq!(wizard.state().monthly_income, 110_000.0);
        wizard.back();
        wizard.back();
        wizard.back();
        assert_eq!(wizard.back(), WizardStep::Intent);

        wizard.reset();
        assert_eq!(wizard.state(), &WizardState::default());
    }

    #[test]
    fn test_summary_only_at_last_step() {
        let cfg = config();
        assert!(Wizard::new().summary(&cfg).is_err());

        let summary = completed().summary(&cfg).unwrap();
        assert_eq!(summary.report.verdict, Verdict::Approvable);
        assert!(!summary.offers.is_empty());
        assert_eq!(summary.report.rate, summary.offers[0].rate);
    }

    #[test]
    fn test_choose_fixation_and_term() {
        let cfg = config();
        let mut wizard = completed();
        wizard.choose(10, 25, &cfg).unwrap();
        assert_eq!(wizard.state().fixation_years, 10);
        assert_eq!(wizard.step(), WizardStep::Summary);

        assert!(wizard.choose(4, 25, &cfg).is_err());
        assert!(wizard.choose(5, 40, &cfg).is_err());
    }

    #[test]
    fn test_resume_positions_on_missing_step() {
        let params = LoanParameters {
            intent: Some(Intent::Purchase),
            property_value: Some(3_000_000.0),
            ..Default::default()
        };
        let wizard = Wizard::resume(&params, &RiskLimits::default());
        assert_eq!(wizard.step(), WizardStep::Resources);
        assert_eq!(wizard.state().property_value, 3_000_000.0);
    }

    #[test]
    fn test_resume_stops_on_inconsistent_values() {
        let limits = RiskLimits::default();
        let params = LoanParameters {
            intent: Some(Intent::Purchase),
            property_value: Some(1_000_000.0),
            own_resources: Some(3_000_000.0),
            monthly_income: Some(80_000.0),
            term_years: Some(45),
            ..Default::default()
        };
        let wizard = Wizard::resume(&params, &limits);
        assert_eq!(wizard.step(), WizardStep::Resources);
        assert_eq!(wizard.state().property_value, 1_000_000.0);
        assert_eq!(wizard.state().own_resources, 0.0);
        assert_eq!(wizard.state().term_years, WizardState::default().term_years);
        assert!(wizard.summary(&config()).is_err());

        let zero_value = LoanParameters {
            property_value: Some(0.0),
            ..params.clone()
        };
        assert_eq!(Wizard::resume(&zero_value, &limits).step(), WizardStep::Property);
    }

    #[test]
    fn test_resume_applies_valid_terms() {
        let params = LoanParameters {
            intent: Some(Intent::Construction),
            property_value: Some(5_000_000.0),
            own_resources: Some(1_000_000.0),
            monthly_income: Some(90_000.0),
            fixation_years: Some(3),
            term_years: Some(25),
            ..Default::default()
        };
        let wizard = Wizard::resume(&params, &RiskLimits::default());
        assert_eq!(wizard.step(), WizardStep::Summary);
        assert_eq!(wizard.state().fixation_years, 3);
        assert_eq!(wizard.state().term_years, 25);
        assert_eq!(wizard.state().monthly_liabilities, 0.0);
    }
}
