//! Multi-month loss detection over campaign-month rows.
//!
//! Five independent detectors run over every campaign's month series; all
//! results are concatenated and sorted by severity. Series with fewer than
//! two months are skipped by the pairwise and first/last detectors.

use std::collections::BTreeMap;

use campaign_core::config::TrendThresholds;
use campaign_core::types::{round2, MeasuredRecord, Severity};
use serde::Serialize;
use tracing::debug;

use crate::measure::{month_index, month_label, series_by_campaign};

const RATIO_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LossKind {
    SpendUpConversionsDown,
    DecliningEfficiency,
    CtrSuddenDrop,
    CvrSuddenDrop,
    HighSpendLowRoas,
    Inactive,
}

impl LossKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SpendUpConversionsDown => "SPEND_UP_CONVERSIONS_DOWN",
            Self::DecliningEfficiency => "DECLINING_EFFICIENCY",
            Self::CtrSuddenDrop => "CTR_SUDDEN_DROP",
            Self::CvrSuddenDrop => "CVR_SUDDEN_DROP",
            Self::HighSpendLowRoas => "HIGH_SPEND_LOW_ROAS",
            Self::Inactive => "INACTIVE",
        }
    }
}

/// Detector-specific evidence. Serialized flat into [`LossIssue`] with an
/// `issue_type` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LossDetail {
    SpendUpConversionsDown {
        from_month: String,
        to_month: String,
        spend_change: f64,
        spend_change_pct: f64,
        conversion_loss: f64,
        prev_cpa: Option<f64>,
        curr_cpa: Option<f64>,
    },
    DecliningEfficiency {
        first_month: String,
        last_month: String,
        initial_cpa: f64,
        final_cpa: f64,
        cpa_increase: f64,
        cpa_increase_pct: f64,
    },
    CtrSuddenDrop {
        from_month: String,
        to_month: String,
        previous_ctr: f64,
        current_ctr: f64,
        ctr_drop_pct: f64,
    },
    CvrSuddenDrop {
        from_month: String,
        to_month: String,
        previous_cvr: f64,
        current_cvr: f64,
        cvr_drop_pct: f64,
    },
    HighSpendLowRoas {
        month: String,
        spend: f64,
        conversions: f64,
        revenue: f64,
        roas: f64,
    },
    Inactive {
        month: String,
        impressions: u64,
        clicks: u64,
        conversions: f64,
        spend: f64,
    },
}

impl LossDetail {
    pub fn kind(&self) -> LossKind {
        match self {
            Self::SpendUpConversionsDown { .. } => LossKind::SpendUpConversionsDown,
            Self::DecliningEfficiency { .. } => LossKind::DecliningEfficiency,
            Self::CtrSuddenDrop { .. } => LossKind::CtrSuddenDrop,
            Self::CvrSuddenDrop { .. } => LossKind::CvrSuddenDrop,
            Self::HighSpendLowRoas { .. } => LossKind::HighSpendLowRoas,
            Self::Inactive { .. } => LossKind::Inactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossIssue {
    pub campaign_name: String,
    pub campaign_type: Option<String>,
    pub severity: Severity,
    pub description: String,
    #[serde(flatten)]
    pub detail: LossDetail,
}

impl LossIssue {
    pub fn kind(&self) -> LossKind {
        self.detail.kind()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LossSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub by_type: BTreeMap<String, usize>,
}

// ---------------------------------------------------------------------------
// LossDetector
// ---------------------------------------------------------------------------

pub struct LossDetector {
    thresholds: TrendThresholds,
    currency: String,
}

impl LossDetector {
    pub fn new(thresholds: &TrendThresholds, currency: impl Into<String>) -> Self {
        Self {
            thresholds: thresholds.clone(),
            currency: currency.into(),
        }
    }

    /// Run all detectors over campaign-month rows.
    pub fn detect(&self, rows: &[MeasuredRecord]) -> Vec<LossIssue> {
        let mut losses = Vec::new();
        losses.extend(self.spend_up_conversions_down(rows));
        losses.extend(self.declining_efficiency(rows));
        losses.extend(self.sudden_drops(rows));
        losses.extend(self.high_spend_low_roas(rows));
        losses.extend(self.inactive(rows));
        losses.sort_by_key(|l| l.severity.rank());

        debug!(rows = rows.len(), losses = losses.len(), "loss detection complete");
        metrics::counter!("analysis.losses_detected").increment(losses.len() as u64);
        losses
    }

    pub fn spend_up_conversions_down(&self, rows: &[MeasuredRecord]) -> Vec<LossIssue> {
        let mut out = Vec::new();
        for (campaign, series) in series_by_campaign(rows) {
            for pair in series.windows(2) {
                let (prev, curr) = (pair[0], pair[1]);
                let spend_change = curr.counters().cost - prev.counters().cost;
                let conversion_change = curr.counters().conversions - prev.counters().conversions;
                if spend_change <= 0.0 || conversion_change >= 0.0 {
                    continue;
                }
                let conversion_loss = conversion_change.abs();
                out.push(LossIssue {
                    campaign_name: campaign.to_string(),
                    campaign_type: prev.record.campaign_type.clone(),
                    severity: Severity::High,
                    description: format!(
                        "Spend increased by {} {spend_change:.2} but lost {conversion_loss} conversions",
                        self.currency
                    ),
                    detail: LossDetail::SpendUpConversionsDown {
                        from_month: month_label(prev),
                        to_month: month_label(curr),
                        spend_change: round2(spend_change),
                        spend_change_pct: round2(
                            spend_change / prev.counters().cost.max(1.0) * 100.0,
                        ),
                        conversion_loss,
                        prev_cpa: prev.metrics.cpa.map(round2),
                        curr_cpa: curr.metrics.cpa.map(round2),
                    },
                });
            }
        }
        out
    }

    /// First vs last month CPA. Skipped when either CPA is undefined.
    pub fn declining_efficiency(&self, rows: &[MeasuredRecord]) -> Vec<LossIssue> {
        let t = &self.thresholds;
        let mut out = Vec::new();
        for (campaign, series) in series_by_campaign(rows) {
            let (Some(first), Some(last)) = (series.first(), series.last()) else {
                continue;
            };
            if series.len() < 2 {
                continue;
            }
            let (Some(initial), Some(fin)) = (first.metrics.cpa, last.metrics.cpa) else {
                continue;
            };
            if initial <= 0.0 || fin < initial * t.efficiency_decline_ratio - RATIO_EPSILON {
                continue;
            }
            let severity = if fin >= initial * t.efficiency_critical_ratio - RATIO_EPSILON {
                Severity::High
            } else {
                Severity::Medium
            };
            out.push(LossIssue {
                campaign_name: campaign.to_string(),
                campaign_type: first.record.campaign_type.clone(),
                severity,
                description: format!(
                    "CPA deteriorated from {c} {initial:.2} to {c} {fin:.2}",
                    c = self.currency
                ),
                detail: LossDetail::DecliningEfficiency {
                    first_month: month_label(first),
                    last_month: month_label(last),
                    initial_cpa: round2(initial),
                    final_cpa: round2(fin),
                    cpa_increase: round2(fin - initial),
                    cpa_increase_pct: round2((fin - initial) / initial * 100.0),
                },
            });
        }
        out
    }

    /// Month-to-month relative drops in CTR or conversion rate.
    pub fn sudden_drops(&self, rows: &[MeasuredRecord]) -> Vec<LossIssue> {
        let ratio = self.thresholds.sudden_drop_ratio;
        let mut out = Vec::new();
        for (campaign, series) in series_by_campaign(rows) {
            for pair in series.windows(2) {
                let (prev, curr) = (pair[0], pair[1]);
                let base = || (campaign.to_string(), prev.record.campaign_type.clone());

                if let Some(change) = relative_drop(prev.metrics.ctr, curr.metrics.ctr, ratio) {
                    let (campaign_name, campaign_type) = base();
                    out.push(LossIssue {
                        campaign_name,
                        campaign_type,
                        severity: Severity::High,
                        description: format!(
                            "CTR dropped from {:.2}% to {:.2}%",
                            prev.metrics.ctr, curr.metrics.ctr
                        ),
                        detail: LossDetail::CtrSuddenDrop {
                            from_month: month_label(prev),
                            to_month: month_label(curr),
                            previous_ctr: round2(prev.metrics.ctr),
                            current_ctr: round2(curr.metrics.ctr),
                            ctr_drop_pct: round2(change * 100.0),
                        },
                    });
                }

                if let Some(change) = relative_drop(
                    prev.metrics.conversion_rate,
                    curr.metrics.conversion_rate,
                    ratio,
                ) {
                    let (campaign_name, campaign_type) = base();
                    out.push(LossIssue {
                        campaign_name,
                        campaign_type,
                        severity: Severity::High,
                        description: format!(
                            "CVR dropped from {:.2}% to {:.2}%",
                            prev.metrics.conversion_rate, curr.metrics.conversion_rate
                        ),
                        detail: LossDetail::CvrSuddenDrop {
                            from_month: month_label(prev),
                            to_month: month_label(curr),
                            previous_cvr: round2(prev.metrics.conversion_rate),
                            current_cvr: round2(curr.metrics.conversion_rate),
                            cvr_drop_pct: round2(change * 100.0),
                        },
                    });
                }
            }
        }
        out
    }

    /// Rows spending well above a typical month while losing money.
    pub fn high_spend_low_roas(&self, rows: &[MeasuredRecord]) -> Vec<LossIssue> {
        let t = &self.thresholds;
        let threshold = mean_of_monthly_medians(rows) * t.high_spend_multiplier;
        rows.iter()
            .filter(|r| {
                let c = r.counters();
                c.cost > threshold && r.metrics.roas < t.low_roas && c.cost > t.min_cost
            })
            .map(|r| {
                let c = r.counters();
                let severity = if r.metrics.roas > t.low_roas_medium_floor {
                    Severity::Medium
                } else {
                    Severity::High
                };
                LossIssue {
                    campaign_name: r.record.campaign_name.clone(),
                    campaign_type: r.record.campaign_type.clone(),
                    severity,
                    description: format!(
                        "Spending {} {:.2} with ROAS of {:.2}x (unprofitable)",
                        self.currency, c.cost, r.metrics.roas
                    ),
                    detail: LossDetail::HighSpendLowRoas {
                        month: month_label(r),
                        spend: round2(c.cost),
                        conversions: c.conversions,
                        revenue: round2(c.revenue_or_zero()),
                        roas: round2(r.metrics.roas),
                    },
                }
            })
            .collect()
    }

    pub fn inactive(&self, rows: &[MeasuredRecord]) -> Vec<LossIssue> {
        rows.iter()
            .filter(|r| {
                let c = r.counters();
                c.impressions == 0 || (c.clicks == 0 && c.conversions == 0.0)
            })
            .map(|r| {
                let c = r.counters();
                LossIssue {
                    campaign_name: r.record.campaign_name.clone(),
                    campaign_type: r.record.campaign_type.clone(),
                    severity: Severity::Medium,
                    description: "Campaign showing zero or minimal activity (potential budget waste)"
                        .to_string(),
                    detail: LossDetail::Inactive {
                        month: month_label(r),
                        impressions: c.impressions,
                        clicks: c.clicks,
                        conversions: c.conversions,
                        spend: round2(c.cost),
                    },
                }
            })
            .collect()
    }
}

pub fn summarize(losses: &[LossIssue]) -> LossSummary {
    let mut summary = LossSummary {
        total: losses.len(),
        ..Default::default()
    };
    for loss in losses {
        match loss.severity {
            Severity::High => summary.high += 1,
            Severity::Medium => summary.medium += 1,
            Severity::Low => summary.low += 1,
        }
        *summary
            .by_type
            .entry(loss.kind().as_str().to_string())
            .or_insert(0) += 1;
    }
    summary
}

/// Relative change when `current` fell by at least `ratio` of a positive
/// `previous`, e.g. `-0.6` for a 60% drop.
fn relative_drop(previous: f64, current: f64, ratio: f64) -> Option<f64> {
    if previous <= 0.0 {
        return None;
    }
    let change = (current - previous) / previous;
    (change <= -ratio + RATIO_EPSILON).then_some(change)
}

fn mean_of_monthly_medians(rows: &[MeasuredRecord]) -> f64 {
    let mut by_month: BTreeMap<Option<i32>, Vec<f64>> = BTreeMap::new();
    for r in rows {
        by_month.entry(month_index(r)).or_default().push(r.counters().cost);
    }
    if by_month.is_empty() {
        return 0.0;
    }
    let medians: Vec<f64> = by_month.into_values().map(median).collect();
    medians.iter().sum::<f64>() / medians.len() as f64
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => values[n / 2],
        _ => (values[n / 2 - 1] + values[n / 2]) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::by_campaign_month;
    use campaign_core::types::{Counters, RawRecord};

    fn month(campaign: &str, label: &str, index: i32, counters: Counters) -> RawRecord {
        RawRecord::campaign(campaign, counters).in_month(label, index)
    }

    fn detector() -> LossDetector {
        LossDetector::new(&TrendThresholds::default(), "AED")
    }

    #[test]
    fn test_spend_up_conversions_down() {
        let rows = by_campaign_month(&[
            month("X", "Mar 2025", 24302, Counters::new(10_000, 500, 1000.0, 20.0)),
            month("X", "Apr 2025", 24303, Counters::new(10_000, 500, 1500.0, 10.0)),
        ]);
        let losses = detector().spend_up_conversions_down(&rows);
        assert_eq!(losses.len(), 1);
        assert_eq!(losses[0].severity, Severity::High);
        match &losses[0].detail {
            LossDetail::SpendUpConversionsDown {
                spend_change,
                conversion_loss,
                spend_change_pct,
                from_month,
                ..
            } => {
                assert!((spend_change - 500.0).abs() < f64::EPSILON);
                assert!((conversion_loss - 10.0).abs() < f64::EPSILON);
                assert!((spend_change_pct - 50.0).abs() < f64::EPSILON);
                assert_eq!(from_month, "Mar 2025");
            }
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn test_declining_efficiency_medium_at_forty_percent() {
        let rows = by_campaign_month(&[
            month("C", "Jan 2025", 24300, Counters::new(1000, 100, 1000.0, 10.0)),
            month("C", "Feb 2025", 24301, Counters::new(1000, 100, 1400.0, 10.0)),
        ]);
        let losses = detector().declining_efficiency(&rows);
        assert_eq!(losses.len(), 1);
        assert_eq!(losses[0].severity, Severity::Medium);
        assert_eq!(losses[0].kind(), LossKind::DecliningEfficiency);
    }

    #[test]
    fn test_declining_efficiency_boundaries() {
        let run = |last_cost: f64| {
            let rows = by_campaign_month(&[
                month("C", "Jan 2025", 24300, Counters::new(1000, 100, 1000.0, 10.0)),
                month("C", "Feb 2025", 24301, Counters::new(1000, 100, last_cost, 10.0)),
            ]);
            detector().declining_efficiency(&rows)
        };
        assert_eq!(run(1300.0).len(), 1);
        assert!(run(1290.0).is_empty());
        assert_eq!(run(1500.0)[0].severity, Severity::High);
    }

    #[test]
    fn test_single_month_series_skipped() {
        let rows = by_campaign_month(&[month(
            "Solo",
            "Jan 2025",
            24300,
            Counters::new(1000, 100, 1000.0, 10.0),
        )]);
        let d = detector();
        assert!(d.spend_up_conversions_down(&rows).is_empty());
        assert!(d.declining_efficiency(&rows).is_empty());
        assert!(d.sudden_drops(&rows).is_empty());
    }

    #[test]
    fn test_sudden_ctr_and_cvr_drop() {
        let rows = by_campaign_month(&[
            month("D", "Jan 2025", 24300, Counters::new(1000, 40, 100.0, 8.0)),
            month("D", "Feb 2025", 24301, Counters::new(1000, 20, 100.0, 1.0)),
        ]);
        let kinds: Vec<LossKind> = detector().sudden_drops(&rows).iter().map(|l| l.kind()).collect();
        assert_eq!(kinds, vec![LossKind::CtrSuddenDrop, LossKind::CvrSuddenDrop]);
    }

    #[test]
    fn test_high_spend_low_roas_and_inactive() {
        let rows = by_campaign_month(&[
            month("Big", "Jan 2025", 24300, Counters::new(5000, 100, 3000.0, 2.0).with_revenue(1500.0)),
            month("Small", "Jan 2025", 24300, Counters::new(500, 10, 200.0, 1.0).with_revenue(600.0)),
            month("Tiny", "Jan 2025", 24300, Counters::new(0, 0, 0.0, 0.0)),
        ]);
        let d = detector();
        let hs = d.high_spend_low_roas(&rows);
        assert_eq!(hs.len(), 1);
        assert_eq!(hs[0].campaign_name, "Big");
        assert_eq!(hs[0].severity, Severity::High);

        let inactive = d.inactive(&rows);
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].campaign_name, "Tiny");
        assert_eq!(inactive[0].severity, Severity::Medium);
    }

    #[test]
    fn test_detect_sorts_by_severity_and_summarizes() {
        let rows = by_campaign_month(&[
            month("X", "Mar 2025", 24302, Counters::new(0, 0, 0.0, 0.0)),
            month("X", "Apr 2025", 24303, Counters::new(10, 0, 10.0, 0.0)),
            month("Y", "Mar 2025", 24302, Counters::new(1000, 50, 1000.0, 20.0)),
            month("Y", "Apr 2025", 24303, Counters::new(1000, 50, 1500.0, 10.0)),
        ]);
        let losses = detector().detect(&rows);
        let ranks: Vec<u8> = losses.iter().map(|l| l.severity.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);

        let summary = summarize(&losses);
        assert_eq!(summary.total, losses.len());
        assert_eq!(summary.by_type.get("INACTIVE"), Some(&2));
    }

    #[test]
    fn test_loss_serializes_flat_with_tag() {
        let rows = by_campaign_month(&[month("T", "Jan 2025", 24300, Counters::new(0, 0, 0.0, 0.0))]);
        let losses = detector().inactive(&rows);
        let json = serde_json::to_value(&losses[0]).unwrap();
        assert_eq!(json["issue_type"], "INACTIVE");
        assert_eq!(json["campaign_name"], "T");
        assert_eq!(json["month"], "Jan 2025");
    }

    #[test]
    fn test_median_even_and_odd() {
        assert!((median(vec![3.0, 1.0, 2.0]) - 2.0).abs() < f64::EPSILON);
        assert!((median(vec![4.0, 1.0, 2.0, 3.0]) - 2.5).abs() < f64::EPSILON);
    }
}
