//! Recommendation synthesis, campaign advice, budget allocation, business
//! context and monthly strategy.

pub mod advisor;
pub mod budget;
pub mod business;
pub mod strategy;
pub mod synthesizer;

pub use advisor::CampaignAdvisor;
pub use budget::{BudgetAllocator, BudgetPlan};
pub use business::{BusinessContext, BusinessContextAnalyzer};
pub use strategy::{ExecutiveSummary, StrategicPlan, StrategicPlanner};
pub use synthesizer::{RecommendationSummary, RecommendationSynthesizer};
