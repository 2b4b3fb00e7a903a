use crate::domain::model::{BankProfile, MarketRates, RiskLimits, FIXATION_PERIODS, LTV_BANDS};
use crate::utils::error::{MortgageError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_unique, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_RATES: &str = include_str!("../../config/rates.toml");

fn default_offer_limit() -> usize {
    3
}

/// 利率表、費用與風險上限
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesConfig {
    #[serde(default = "default_offer_limit")]
    pub offer_limit: usize,
    #[serde(default)]
    pub limits: RiskLimits,
    pub market: MarketRates,
    #[serde(default)]
    pub banks: Vec<BankProfile>,
}

impl RatesConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MortgageError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MortgageError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Built-in tables shipped with the crate.
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(DEFAULT_RATES)
    }

    /// 有指定路徑時讀檔，否則使用內建利率表
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                tracing::debug!("Loading rate tables from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::embedded()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// 替換環境變數 (例如 ${MARKET_SLOPE})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MortgageError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn bank(&self, id: &str) -> Option<&BankProfile> {
        self.banks.iter().find(|b| b.id == id)
    }
}

impl Validate for RatesConfig {
    fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        validate_range("limits.max_ltv", limits.max_ltv, 0.0, 1.0)?;
        validate_range("limits.ltv_warning", limits.ltv_warning, 0.0, limits.max_ltv)?;
        validate_range("limits.max_dsti", limits.max_dsti, 0.0, 1.0)?;
        validate_range("limits.dsti_warning", limits.dsti_warning, 0.0, limits.max_dsti)?;
        validate_range("limits.min_term", limits.min_term, 1, limits.max_term)?;
        validate_range("limits.max_term", limits.max_term, limits.min_term, 50)?;
        validate_range("offer_limit", self.offer_limit, 1, 20)?;

        for base in &self.market.base_rates {
            validate_fixation("market.base_rates.fixation_years", base.fixation_years)?;
            validate_range("market.base_rates.rate", base.rate, 0.0, 30.0)?;
        }
        validate_range("market.ltv_pivot", self.market.ltv_pivot, 0.0, 1.0)?;

        validate_unique("banks.id", self.banks.iter().map(|b| b.id.as_str()))?;
        for bank in &self.banks {
            validate_non_empty_string("banks.id", &bank.id)?;
            validate_non_empty_string("banks.name", &bank.name)?;
            validate_range("banks.max_ltv", bank.max_ltv, 0.0, 1.0)?;

            for row in &bank.rates {
                validate_fixation("banks.rates.fixation_years", row.fixation_years)?;
                if row.band_rates.len() > LTV_BANDS.len() {
                    return Err(MortgageError::ConfigValidationError {
                        field: format!("banks.{}.rates", bank.id),
                        message: format!(
                            "at most {} LTV bands are supported, got {}",
                            LTV_BANDS.len(),
                            row.band_rates.len()
                        ),
                    });
                }
                for rate in &row.band_rates {
                    validate_range("banks.rates.band_rates", *rate, 0.0, 30.0)?;
                }
            }

            for (field, fee) in [
                ("fees.processing_fee", bank.fees.processing_fee),
                ("fees.valuation_fee", bank.fees.valuation_fee),
                ("fees.monthly_account_fee", bank.fees.monthly_account_fee),
            ] {
                if !(fee.is_finite() && fee >= 0.0) {
                    return Err(MortgageError::InvalidConfigValueError {
                        field: format!("banks.{}.{}", bank.id, field),
                        value: fee.to_string(),
                        reason: "Fee must be a non-negative number".to_string(),
                    });
                }
            }
        }

        tracing::debug!("Rate configuration validation passed ({} banks)", self.banks.len());
        Ok(())
    }
}

fn validate_fixation(field_name: &str, years: u32) -> Result<()> {
    if !FIXATION_PERIODS.contains(&years) {
        return Err(MortgageError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: years.to_string(),
            reason: format!("Supported fixation periods: {:?}", FIXATION_PERIODS),
        });
    }
    Ok(())
}
