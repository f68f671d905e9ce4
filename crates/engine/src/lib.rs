//! End-to-end analysis pipelines for the campaign, keyword and monthly
//! tracks. Each pipeline turns CSV text into a serializable report.

pub mod campaign;
pub mod keyword;
pub mod monthly;
pub mod stage;
pub mod summary;

pub use campaign::{CampaignPipeline, CampaignReport};
pub use keyword::{KeywordPipeline, KeywordReport};
pub use monthly::{MonthlyPipeline, MonthlyReport, MonthlySummary};
pub use stage::{StageFailure, Stages};
pub use summary::SummaryCounts;
