use crate::core::wizard::check_terms;
use crate::domain::model::{
    Intent, RiskLimits, WizardState, DEFAULT_FIXATION_YEARS, DEFAULT_TERM_YEARS, FIXATION_PERIODS,
};
use crate::utils::error::{MortgageError, Result};
use crate::utils::validation::{
    validate_amount, validate_contact, validate_range, validate_url, Validate,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "mortgage")]
#[command(about = "Mortgage affordability calculator, bank offer comparison and AI assistant")]
pub struct CliConfig {
    /// Rate tables in TOML, the built-in tables are used when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Print results as JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Monthly payment for a loan amount
    Payment {
        #[arg(long)]
        loan: f64,
        #[arg(long)]
        rate: f64,
        #[arg(long, default_value_t = DEFAULT_TERM_YEARS)]
        term: u32,
    },
    /// Affordability report (LTV, DSTI, verdict) with the best offers
    Assess(LoanArgs),
    /// Best bank offers for the given situation
    Offers(LoanArgs),
    /// Amortization schedule, optionally exported as CSV
    Schedule {
        #[arg(long)]
        loan: f64,
        #[arg(long)]
        rate: f64,
        #[arg(long, default_value_t = DEFAULT_TERM_YEARS)]
        term: u32,
        #[arg(long, help = "Aggregate rows per year")]
        yearly: bool,
        #[arg(long, help = "Write the schedule to this CSV file")]
        csv: Option<PathBuf>,
    },
    /// Interactive conversation with the mortgage assistant
    Chat(ChatArgs),
    /// Send contact details to the lead proxy
    Lead(LeadArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IntentArg {
    Purchase,
    Construction,
    Refinance,
    Reconstruction,
}

impl From<IntentArg> for Intent {
    fn from(value: IntentArg) -> Self {
        match value {
            IntentArg::Purchase => Intent::Purchase,
            IntentArg::Construction => Intent::Construction,
            IntentArg::Refinance => Intent::Refinance,
            IntentArg::Reconstruction => Intent::Reconstruction,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct LoanArgs {
    #[arg(long, value_enum, default_value = "purchase")]
    pub intent: IntentArg,
    #[arg(long)]
    pub property_value: f64,
    #[arg(long)]
    pub own_resources: f64,
    #[arg(long)]
    pub income: f64,
    #[arg(long, default_value_t = 0.0)]
    pub liabilities: f64,
    #[arg(long, default_value_t = DEFAULT_FIXATION_YEARS)]
    pub fixation: u32,
    #[arg(long, default_value_t = DEFAULT_TERM_YEARS)]
    pub term: u32,
}

impl LoanArgs {
    pub fn to_state(&self) -> WizardState {
        WizardState {
            intent: Some(self.intent.into()),
            property_value: self.property_value,
            own_resources: self.own_resources,
            monthly_income: self.income,
            monthly_liabilities: self.liabilities,
            fixation_years: self.fixation,
            term_years: self.term,
        }
    }

    /// Term and fixation against the limits of the loaded rate tables.
    pub fn validate_terms(&self, limits: &RiskLimits) -> Result<()> {
        check_terms(self.fixation, self.term, limits)
    }
}

impl Validate for LoanArgs {
    fn validate(&self) -> Result<()> {
        validate_amount("property_value", self.property_value)?;
        validate_amount("own_resources", self.own_resources)?;
        validate_amount("income", self.income)?;
        validate_amount("liabilities", self.liabilities)?;
        validate_range("term", self.term, 1, 50)?;
        if !FIXATION_PERIODS.contains(&self.fixation) {
            return Err(MortgageError::validation(
                "fixation",
                format!("supported periods are {:?}", FIXATION_PERIODS),
            ));
        }
        if self.own_resources > self.property_value {
            return Err(MortgageError::validation(
                "own_resources",
                "cannot exceed the property value",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
pub struct ChatArgs {
    /// Chat proxy URL; without it the API is called directly with GEMINI_API_KEY
    #[arg(long)]
    pub endpoint: Option<String>,
    #[arg(long, default_value_t = 20)]
    pub max_history: usize,
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

#[derive(Debug, Clone, Args)]
pub struct LeadArgs {
    #[arg(long)]
    pub endpoint: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub note: Option<String>,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Payment { loan, rate, term } | Command::Schedule { loan, rate, term, .. } => {
                validate_amount("loan", *loan)?;
                validate_amount("rate", *rate)?;
                validate_range("term", *term, 1, 50)?;
            }
            Command::Assess(args) | Command::Offers(args) => args.validate()?,
            Command::Chat(args) => {
                if let Some(endpoint) = &args.endpoint {
                    validate_url("endpoint", endpoint)?;
                }
                validate_range("timeout", args.timeout, 1, 300)?;
            }
            Command::Lead(args) => {
                validate_url("endpoint", &args.endpoint)?;
                validate_contact(args.email.as_deref(), args.phone.as_deref())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assess_arguments() {
        let config = CliConfig::parse_from([
            "mortgage",
            "--json",
            "assess",
            "--property-value",
            "5000000",
            "--own-resources",
            "1000000",
            "--income",
            "90000",
            "--intent",
            "refinance",
        ]);

        assert!(config.json);
        let Command::Assess(args) = &config.command else {
            panic!("expected assess");
        };
        let state = args.to_state();
        assert_eq!(state.intent, Some(Intent::Refinance));
        assert_eq!(state.fixation_years, DEFAULT_FIXATION_YEARS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_input() {
        let config = CliConfig::parse_from([
            "mortgage", "offers", "--property-value", "1000000", "--own-resources", "2000000",
            "--income", "50000",
        ]);
        assert!(config.validate().is_err());

        let config = CliConfig::parse_from(["mortgage", "lead", "--endpoint", "https://x.cz/lead"]);
        assert!(config.validate().is_err());

        let config = CliConfig::parse_from(["mortgage", "payment", "--loan", "100", "--rate=-1"]);
        assert!(config.validate().is_err());

        let config = CliConfig::parse_from([
            "mortgage", "lead", "--endpoint", "https://x.cz/lead", "--email", "  ",
        ]);
        assert!(config.validate().is_err());
    }

    fn assess_args(extra: &[&str]) -> LoanArgs {
        let mut argv = vec![
            "mortgage", "assess", "--property-value", "5000000", "--own-resources", "1000000",
            "--income", "90000",
        ];
        argv.extend_from_slice(extra);
        match CliConfig::parse_from(argv).command {
            Command::Assess(args) => args,
            other => panic!("expected assess, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_fixation_rejected() {
        let args = assess_args(&["--fixation", "4"]);
        let err = args.validate().unwrap_err();
        assert!(matches!(err, MortgageError::ValidationError { ref field, .. } if field == "fixation"));
        assert!(assess_args(&["--fixation", "7"]).validate().is_ok());
    }

    #[test]
    fn test_term_checked_against_risk_limits() {
        let limits = RiskLimits::default();
        let args = assess_args(&["--term", "45"]);
        assert!(args.validate().is_ok());
        assert!(args.validate_terms(&limits).is_err());
        assert!(assess_args(&["--term", "20"]).validate_terms(&limits).is_ok());
    }
}
