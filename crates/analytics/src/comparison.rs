//! Campaign comparison and segment breakdowns.

use campaign_core::types::{Counters, MeasuredRecord, Metric, Metrics, RawRecord};
use serde::Serialize;

use crate::measure::{aggregate, apply_spend_share};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub campaign_name: String,
    pub value: f64,
}

/// Best and worst campaign per headline metric. Campaigns with undefined
/// CPA take no part in the CPA comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignComparison {
    pub best_cpa: Option<Standing>,
    pub worst_cpa: Option<Standing>,
    pub best_roas: Option<Standing>,
    pub worst_roas: Option<Standing>,
    pub best_ctr: Option<Standing>,
    pub worst_ctr: Option<Standing>,
    pub best_conversion_rate: Option<Standing>,
    pub worst_conversion_rate: Option<Standing>,
}

pub fn compare(campaigns: &[MeasuredRecord]) -> CampaignComparison {
    let (best_cpa, worst_cpa) = extremes(campaigns, Metric::Cpa, false);
    let (best_roas, worst_roas) = extremes(campaigns, Metric::Roas, true);
    let (best_ctr, worst_ctr) = extremes(campaigns, Metric::Ctr, true);
    let (best_conversion_rate, worst_conversion_rate) =
        extremes(campaigns, Metric::ConversionRate, true);
    CampaignComparison {
        best_cpa,
        worst_cpa,
        best_roas,
        worst_roas,
        best_ctr,
        worst_ctr,
        best_conversion_rate,
        worst_conversion_rate,
    }
}

/// (best, worst) for one metric. First campaign wins ties.
fn extremes(
    campaigns: &[MeasuredRecord],
    metric: Metric,
    higher_is_better: bool,
) -> (Option<Standing>, Option<Standing>) {
    let mut best: Option<(&MeasuredRecord, f64)> = None;
    let mut worst: Option<(&MeasuredRecord, f64)> = None;
    for c in campaigns {
        let Some(v) = c.value(metric) else { continue };
        let better = |other: f64| if higher_is_better { v > other } else { v < other };
        let worse = |other: f64| if higher_is_better { v < other } else { v > other };
        if best.map_or(true, |(_, b)| better(b)) {
            best = Some((c, v));
        }
        if worst.map_or(true, |(_, w)| worse(w)) {
            worst = Some((c, v));
        }
    }
    let standing = |(r, v): (&MeasuredRecord, f64)| Standing {
        campaign_name: r.record.campaign_name.clone(),
        value: v,
    };
    (best.map(standing), worst.map(standing))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentDimension {
    Platform,
    DeviceOs,
    CampaignType,
}

impl SegmentDimension {
    fn value(self, record: &RawRecord) -> Option<&str> {
        match self {
            Self::Platform => record.platform.as_deref(),
            Self::DeviceOs => record.device_os.as_deref(),
            Self::CampaignType => record.campaign_type.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentPerformance {
    pub segment: String,
    #[serde(flatten)]
    pub counters: Counters,
    #[serde(flatten)]
    pub metrics: Metrics,
}

/// Totals and rates per segment value, with spend share across segments.
/// Rows without a value for the dimension are left out; an export without
/// the column yields an empty breakdown.
pub fn breakdown(records: &[RawRecord], dimension: SegmentDimension) -> Vec<SegmentPerformance> {
    let tagged: Vec<RawRecord> = records
        .iter()
        .filter(|r| dimension.value(r).is_some_and(|v| !v.is_empty()))
        .cloned()
        .collect();
    let mut rows = aggregate(&tagged, |r| dimension.value(r).unwrap_or_default().to_string());
    apply_spend_share(&mut rows, |_| ());
    rows.into_iter()
        .map(|row| SegmentPerformance {
            segment: dimension.value(&row.record).unwrap_or_default().to_string(),
            counters: row.record.counters,
            metrics: row.metrics,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::by_campaign;

    fn campaigns() -> Vec<MeasuredRecord> {
        by_campaign(&[
            RawRecord::campaign("A", Counters::new(1000, 50, 500.0, 10.0).with_revenue(1000.0)),
            RawRecord::campaign("B", Counters::new(1000, 20, 500.0, 0.0)),
            RawRecord::campaign("C", Counters::new(1000, 80, 500.0, 2.0).with_revenue(2000.0)),
        ])
    }

    #[test]
    fn test_compare_picks_extremes() {
        let cmp = compare(&campaigns());
        assert_eq!(cmp.best_cpa.unwrap().campaign_name, "A");
        assert_eq!(cmp.worst_cpa.unwrap().campaign_name, "C");
        assert_eq!(cmp.best_roas.unwrap().campaign_name, "C");
        assert_eq!(cmp.worst_roas.unwrap().campaign_name, "B");
        assert_eq!(cmp.best_ctr.unwrap().campaign_name, "C");
        assert_eq!(cmp.worst_conversion_rate.unwrap().campaign_name, "B");
    }

    #[test]
    fn test_compare_ignores_undefined_cpa() {
        let only_b = by_campaign(&[RawRecord::campaign("B", Counters::new(1000, 20, 500.0, 0.0))]);
        let cmp = compare(&only_b);
        assert!(cmp.best_cpa.is_none());
        assert!(cmp.worst_cpa.is_none());
        assert!(cmp.best_ctr.is_some());
    }

    #[test]
    fn test_compare_ties_keep_first() {
        let rows = by_campaign(&[
            RawRecord::campaign("X", Counters::new(100, 10, 10.0, 1.0)),
            RawRecord::campaign("Y", Counters::new(100, 10, 10.0, 1.0)),
        ]);
        let cmp = compare(&rows);
        assert_eq!(cmp.best_ctr.unwrap().campaign_name, "X");
        assert_eq!(cmp.worst_ctr.unwrap().campaign_name, "X");
    }

    #[test]
    fn test_breakdown_by_device() {
        let mut ios = RawRecord::campaign("A", Counters::new(100, 10, 30.0, 1.0));
        ios.device_os = Some("iOS".to_string());
        let mut android = RawRecord::campaign("B", Counters::new(100, 5, 10.0, 0.0));
        android.device_os = Some("Android".to_string());
        let mut ios2 = RawRecord::campaign("C", Counters::new(100, 5, 60.0, 1.0));
        ios2.device_os = Some("iOS".to_string());
        let untagged = RawRecord::campaign("D", Counters::new(100, 5, 100.0, 1.0));

        let rows = breakdown(&[ios, android, ios2, untagged], SegmentDimension::DeviceOs);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].segment, "Android");
        assert_eq!(rows[1].segment, "iOS");
        assert_eq!(rows[1].counters.clicks, 15);
        assert!((rows[1].metrics.spend_share.unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_breakdown_without_column_is_empty() {
        let rows = breakdown(
            &[RawRecord::campaign("A", Counters::new(1, 1, 1.0, 0.0))],
            SegmentDimension::Platform,
        );
        assert!(rows.is_empty());
    }
}
