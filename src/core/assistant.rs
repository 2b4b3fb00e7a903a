//! Chat assistant that gathers loan parameters turn by turn.
//!
//! Every model reply is expected to end with a machine-readable block,
//! either `<params>{...}</params>` or a ```` ```json ```` fence. The block is
//! stripped from the visible text and merged into the session's
//! [`LoanParameters`].

use crate::config::rates_config::RatesConfig;
use crate::core::{calculator, offers, wizard::Wizard};
use crate::domain::model::{
    AffordabilityReport, ChatMessage, ChatRole, Intent, LoanParameters, MarketRates, RiskLimits,
    FIXATION_PERIODS,
};
use crate::domain::ports::ChatBackend;
use crate::utils::error::{MortgageError, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

pub const DEFAULT_MAX_HISTORY: usize = 20;

static PARAMS_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<params>\s*(\{.*?\})\s*</params>").expect("valid regex"));
static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("valid regex"));
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d[\d\s\u{a0}.,]*").expect("valid regex"));

#[derive(Debug, Clone, Serialize)]
pub struct AssistantReply {
    pub text: String,
    pub updated: Vec<&'static str>,
    pub estimate: Option<AffordabilityReport>,
}

pub struct AssistantSession<B: ChatBackend> {
    backend: B,
    history: Vec<ChatMessage>,
    params: LoanParameters,
    max_history: usize,
    market: MarketRates,
    limits: RiskLimits,
}

impl<B: ChatBackend> AssistantSession<B> {
    pub fn new(backend: B, config: &RatesConfig) -> Self {
        Self {
            backend,
            history: Vec::new(),
            params: LoanParameters::default(),
            max_history: DEFAULT_MAX_HISTORY,
            market: config.market.clone(),
            limits: config.limits,
        }
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history.max(1);
        self
    }

    pub fn params(&self) -> &LoanParameters {
        &self.params
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.params = LoanParameters::default();
    }

    pub fn into_wizard(self) -> Wizard {
        Wizard::resume(&self.params, &self.limits)
    }

    pub async fn send(&mut self, text: &str) -> Result<AssistantReply> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MortgageError::validation("message", "must not be empty"));
        }

        self.history.push(ChatMessage::user(text));

        let system = self.system_instruction();
        let raw = self.backend.generate(&system, self.window()).await?;

        let (visible, extracted) = extract_parameters(&raw);
        let updated = match extracted {
            Some(found) => self.params.merge(&found),
            None => Vec::new(),
        };
        if !updated.is_empty() {
            tracing::debug!("Assistant updated parameters: {:?}", updated);
        }

        self.history.push(ChatMessage::model(visible.clone()));

        Ok(AssistantReply {
            text: visible,
            updated,
            estimate: self.estimate(),
        })
    }

    /// Quick estimate at the market rate once every required field is known.
    pub fn estimate(&self) -> Option<AffordabilityReport> {
        let state = self.params.to_state()?;
        let rate = offers::market_rate(&self.market, state.fixation_years, state.ltv())?;
        Some(calculator::assess(&state, rate, &self.limits))
    }

    // 最近的訊息，且第一則必須是使用者訊息
    fn window(&self) -> &[ChatMessage] {
        let start = self.history.len().saturating_sub(self.max_history);
        let mut window = &self.history[start..];
        while let Some(first) = window.first() {
            if first.role == ChatRole::User {
                break;
            }
            window = &window[1..];
        }
        window
    }

    fn system_instruction(&self) -> String {
        let known = serde_json::to_string(&self.params).unwrap_or_else(|_| "{}".to_string());
        let missing = self.params.missing_fields();
        let intents: Vec<&str> = Intent::ALL.iter().map(|i| i.as_str()).collect();

        let next_step = if missing.is_empty() {
            "All required parameters are known. Summarise the situation and offer to compare bank offers.".to_string()
        } else {
            format!(
                "Still missing: {}. Ask for one of them at a time, in a friendly way.",
                missing.join(", ")
            )
        };

        format!(
            "You are a mortgage advisor helping a client in the Czech Republic. Answer in the \
             language the client writes in, keep answers short and never invent bank offers.\n\n\
             Known parameters (JSON): {known}\n{next_step}\n\n\
             At the end of every answer append exactly one block \
             <params>{{...}}</params> with any parameters the client stated in the latest \
             message. Use the keys intent ({intents}), property_value, own_resources, \
             monthly_income, monthly_liabilities (CZK amounts), fixation_years (one of {fixations:?}) \
             and term_years. Use an empty object when nothing new was stated.",
            known = known,
            next_step = next_step,
            intents = intents.join(" | "),
            fixations = FIXATION_PERIODS,
        )
    }
}

/// Splits a model reply into the visible text and the extracted parameters.
pub fn extract_parameters(reply: &str) -> (String, Option<LoanParameters>) {
    let found = PARAMS_TAG
        .captures(reply)
        .or_else(|| JSON_FENCE.captures(reply));

    let Some(caps) = found else {
        return (reply.trim().to_string(), None);
    };

    let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
        return (reply.trim().to_string(), None);
    };
    let visible = format!("{}{}", &reply[..whole.start()], &reply[whole.end()..])
        .trim()
        .to_string();

    match serde_json::from_str::<Value>(body.as_str()) {
        Ok(Value::Object(map)) => (visible, Some(parameters_from_json(&map))),
        Ok(_) => (visible, None),
        Err(e) => {
            tracing::warn!("Ignoring unparsable parameter block: {}", e);
            (visible, None)
        }
    }
}

fn parameters_from_json(map: &serde_json::Map<String, Value>) -> LoanParameters {
    let amount = |key: &str| -> Option<f64> {
        let value = match map.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_amount(s),
            _ => None,
        }?;
        if value.is_finite() && value >= 0.0 {
            Some(value)
        } else {
            tracing::debug!("Dropping invalid value for {}: {}", key, value);
            None
        }
    };
    let years = |key: &str| -> Option<u32> {
        let value = amount(key)?;
        if value >= 1.0 && value.fract() == 0.0 && value <= 50.0 {
            Some(value as u32)
        } else {
            None
        }
    };

    LoanParameters {
        intent: map.get("intent").and_then(Value::as_str).and_then(Intent::parse),
        property_value: amount("property_value"),
        own_resources: amount("own_resources"),
        monthly_income: amount("monthly_income"),
        monthly_liabilities: amount("monthly_liabilities"),
        fixation_years: years("fixation_years").filter(|y| FIXATION_PERIODS.contains(y)),
        term_years: years("term_years"),
    }
}

/// Lenient amount parser: "3,5 mil", "800 tis.", "45 000 Kč", "2.5M", "1.200.000".
pub fn parse_amount(raw: &str) -> Option<f64> {
    let lowered = raw.trim().to_lowercase();
    let found = NUMBER.find(&lowered)?;
    let rest = lowered[found.end()..].trim_start();

    let unit: String = rest.chars().take_while(|c| c.is_alphabetic()).collect();
    let multiplier = amount_multiplier(&unit);

    let compact: String = found
        .as_str()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    let compact = compact.trim_end_matches(['.', ',']);

    let normalized = normalize_separators(compact);
    let value: f64 = normalized.parse().ok()?;
    Some(value * multiplier)
}

/// Scale for the word right after the number; unknown words such as
/// "měsíčně" leave the amount as is.
fn amount_multiplier(unit: &str) -> f64 {
    match unit {
        "k" | "tis" => 1e3,
        "m" | "mil" => 1e6,
        "mld" => 1e9,
        u if u.starts_with("tisíc") || u.starts_with("tisic") => 1e3,
        u if u.starts_with("miliard") => 1e9,
        u if u.starts_with("milion") || u.starts_with("milión") => 1e6,
        _ => 1.0,
    }
}

fn normalize_separators(number: &str) -> String {
    let commas = number.matches(',').count();
    let dots = number.matches('.').count();

    match (commas, dots) {
        (0, 0) => number.to_string(),
        (c, d) if c > 0 && d > 0 => {
            // 最後出現的是小數點
            let last_comma = number.rfind(',').unwrap_or(0);
            let last_dot = number.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                number.replace('.', "").replace(',', ".")
            } else {
                number.replace(',', "")
            }
        }
        (c, _) if c > 0 => single_separator(number, ','),
        _ => single_separator(number, '.'),
    }
}

fn single_separator(number: &str, sep: char) -> String {
    let count = number.matches(sep).count();
    let digits_after = number.rsplit(sep).next().map(str::len).unwrap_or(0);
    if count == 1 && digits_after != 3 {
        number.replace(sep, ".")
    } else {
        number.replace(sep, "")
    }
}
