pub mod config;
pub mod error;
pub mod taxonomy;
pub mod types;

pub use config::{AnalysisConfig, AppConfig};
pub use error::{CampaignError, CampaignResult};
