//! Data-quality checks. Nothing here aborts a run: findings travel with
//! the results, and only negative counters flip the validity flag.

use std::collections::BTreeMap;
use std::fmt;

use campaign_core::types::RawRecord;
use serde::Serialize;

use crate::columns::{CanonicalColumn, ReportKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityCheck {
    NegativeValues,
    MissingValues,
    ZeroImpressions,
    ZeroClicks,
    LowVolumeCampaign,
    InvalidMatchType,
    SkippedFile,
}

/// One data-quality observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityFinding {
    pub check: QualityCheck,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub count: usize,
    pub message: String,
}

impl fmt::Display for QualityFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub is_valid: bool,
    pub warnings: Vec<QualityFinding>,
    pub errors: Vec<QualityFinding>,
}

impl Default for DataQualityReport {
    fn default() -> Self {
        Self {
            is_valid: true,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl DataQualityReport {
    pub fn warn(&mut self, finding: QualityFinding) {
        self.warnings.push(finding);
    }

    pub fn error(&mut self, finding: QualityFinding) {
        self.is_valid = false;
        self.errors.push(finding);
    }

    /// Fold another report in, prefixing its messages with `context`.
    pub fn absorb(&mut self, other: DataQualityReport, context: &str) {
        let prefix = |mut f: QualityFinding| {
            f.message = format!("[{context}] {}", f.message);
            f
        };
        self.is_valid &= other.is_valid;
        self.warnings.extend(other.warnings.into_iter().map(prefix));
        self.errors.extend(other.errors.into_iter().map(prefix));
    }

    /// Flat list of every message, errors first.
    pub fn messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .map(|f| f.to_string())
            .collect()
    }
}

/// Per-column counts gathered while cells are parsed, before negatives are
/// clamped away.
#[derive(Debug, Clone, Default)]
pub struct CellTally {
    pub negatives: BTreeMap<CanonicalColumn, usize>,
    pub missing: BTreeMap<CanonicalColumn, usize>,
}

impl CellTally {
    pub fn negative(&mut self, column: CanonicalColumn) {
        *self.negatives.entry(column).or_insert(0) += 1;
    }

    pub fn missing(&mut self, column: CanonicalColumn) {
        *self.missing.entry(column).or_insert(0) += 1;
    }
}

/// Run every check over a normalized dataset.
pub fn assess(
    records: &[RawRecord],
    tally: &CellTally,
    kind: ReportKind,
    low_volume_impressions: u64,
) -> DataQualityReport {
    let mut report = DataQualityReport::default();

    for (column, count) in &tally.missing {
        report.warn(QualityFinding {
            check: QualityCheck::MissingValues,
            column: Some(column.name().to_string()),
            count: *count,
            message: format!("Missing values in {}: {count}", column.name()),
        });
    }

    if kind == ReportKind::Keyword {
        let invalid = records
            .iter()
            .filter(|r| r.match_type.as_ref().is_some_and(|m| !m.is_recognized()))
            .count();
        if invalid > 0 {
            report.warn(QualityFinding {
                check: QualityCheck::InvalidMatchType,
                column: Some(CanonicalColumn::MatchType.name().to_string()),
                count: invalid,
                message: format!("Invalid match types found: {invalid}"),
            });
        }
    }

    for (column, count) in &tally.negatives {
        report.error(QualityFinding {
            check: QualityCheck::NegativeValues,
            column: Some(column.name().to_string()),
            count: *count,
            message: format!("Negative values found in {}: {count}", column.name()),
        });
    }

    let zero_impressions = records.iter().filter(|r| r.counters.impressions == 0).count();
    if zero_impressions > 0 {
        report.warn(QualityFinding {
            check: QualityCheck::ZeroImpressions,
            column: Some(CanonicalColumn::Impressions.name().to_string()),
            count: zero_impressions,
            message: format!("Records with zero impressions: {zero_impressions}"),
        });
    }

    let zero_clicks = records.iter().filter(|r| r.counters.clicks == 0).count();
    if zero_clicks > 0 {
        report.warn(QualityFinding {
            check: QualityCheck::ZeroClicks,
            column: Some(CanonicalColumn::Clicks.name().to_string()),
            count: zero_clicks,
            message: format!("Records with zero clicks: {zero_clicks}"),
        });
    }

    if kind != ReportKind::Keyword {
        let mut volumes: BTreeMap<&str, u64> = BTreeMap::new();
        for r in records {
            *volumes.entry(r.campaign_name.as_str()).or_insert(0) += r.counters.impressions;
        }
        for (campaign, volume) in volumes {
            if volume < low_volume_impressions {
                report.warn(QualityFinding {
                    check: QualityCheck::LowVolumeCampaign,
                    column: None,
                    count: 1,
                    message: format!("Low data volume for '{campaign}': {volume} impressions"),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::types::{Counters, MatchType};

    #[test]
    fn test_negative_values_invalidate() {
        let mut tally = CellTally::default();
        tally.negative(CanonicalColumn::Cost);
        let records = vec![RawRecord::campaign("A", Counters::new(500, 10, 0.0, 1.0))];
        let report = assess(&records, &tally, ReportKind::Campaign, 100);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].check, QualityCheck::NegativeValues);
        assert_eq!(report.errors[0].column.as_deref(), Some("cost"));
    }

    #[test]
    fn test_zero_and_low_volume_warnings() {
        let records = vec![
            RawRecord::campaign("A", Counters::new(0, 0, 0.0, 0.0)),
            RawRecord::campaign("A", Counters::new(40, 2, 5.0, 0.0)),
            RawRecord::campaign("B", Counters::new(5000, 100, 50.0, 2.0)),
        ];
        let report = assess(&records, &CellTally::default(), ReportKind::Campaign, 100);
        assert!(report.is_valid);
        let checks: Vec<QualityCheck> = report.warnings.iter().map(|w| w.check).collect();
        assert_eq!(
            checks,
            vec![
                QualityCheck::ZeroImpressions,
                QualityCheck::ZeroClicks,
                QualityCheck::LowVolumeCampaign
            ]
        );
        assert_eq!(report.warnings[2].message, "Low data volume for 'A': 40 impressions");
    }

    #[test]
    fn test_invalid_match_types_counted_for_keywords() {
        let records = vec![
            RawRecord::keyword("C", "laundry", MatchType::Broad, Counters::new(10, 1, 1.0, 0.0)),
            RawRecord::keyword(
                "C",
                "sofa",
                MatchType::from_label("smart"),
                Counters::new(10, 1, 1.0, 0.0),
            ),
        ];
        let report = assess(&records, &CellTally::default(), ReportKind::Keyword, 100);
        assert_eq!(report.warnings[0].check, QualityCheck::InvalidMatchType);
        assert_eq!(report.warnings[0].count, 1);
    }

    #[test]
    fn test_absorb_prefixes_context() {
        let mut base = DataQualityReport::default();
        let mut other = DataQualityReport::default();
        other.error(QualityFinding {
            check: QualityCheck::NegativeValues,
            column: None,
            count: 1,
            message: "Negative values found in cost: 1".to_string(),
        });
        base.absorb(other, "Mar 2025");
        assert!(!base.is_valid);
        assert_eq!(base.messages(), vec!["[Mar 2025] Negative values found in cost: 1"]);
    }
}
