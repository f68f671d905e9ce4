//! Keyword-portfolio analyzers: match-type strategy, lost demand, market
//! themes and website relevance.

pub mod lost_demand;
pub mod market;
pub mod match_type;
pub mod relevance;

pub use lost_demand::{LostDemand, LostDemandDetector, LostDemandKind, LostDemandReport};
pub use market::{MarketInsights, MarketReport};
pub use match_type::{MatchTypeOptimizer, MatchTypeRecommendation};
pub use relevance::{RelevanceChecker, RelevanceReport};
