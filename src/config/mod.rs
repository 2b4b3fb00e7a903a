#[cfg(feature = "cli")]
pub mod cli;
pub mod lambda;
pub mod rates_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
pub use lambda::ProxyConfig;
pub use rates_config::RatesConfig;
