pub mod assistant;
pub mod calculator;
pub mod offers;
pub mod wizard;

pub use crate::domain::model::{Offer, WizardState};
pub use crate::domain::ports::{ChatBackend, LeadSink, Storage};
pub use crate::utils::error::Result;
