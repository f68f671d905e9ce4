//! Metric derivation and rule-based detection over normalized records.

pub mod comparison;
pub mod losses;
pub mod measure;
pub mod rules;
pub mod trends;

pub use losses::{LossDetail, LossDetector, LossIssue};
pub use rules::{IssueDetector, RuleTable, Track};
pub use trends::TrendAnalyzer;
