//! Turns raw ads-platform CSV exports into canonical [`RawRecord`]s.
//!
//! [`RawRecord`]: campaign_core::types::RawRecord

pub mod clean;
pub mod columns;
pub mod monthly;
pub mod normalizer;
pub mod quality;
pub mod table;

pub use columns::{CanonicalColumn, ColumnMapping, ReportKind};
pub use monthly::{MonthlyFile, MonthlyLoader};
pub use normalizer::{ColumnNormalizer, NormalizedDataset};
pub use quality::{DataQualityReport, QualityCheck, QualityFinding};
pub use table::RawTable;
