pub mod adapters;
#[cfg(feature = "cli")]
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod proxy;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{ProxyConfig, RatesConfig};
pub use core::assistant::AssistantSession;
pub use core::wizard::{StepInput, Wizard, WizardStep};
pub use proxy::{ChatProxy, LeadProxy, ProxyRequest, ProxyResponse, ProxyRouter, Route};
pub use utils::error::{MortgageError, Result};
