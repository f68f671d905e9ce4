//! Month-level trend analysis: period-over-period change, per-campaign
//! growth direction, seasonality and volatility.

use std::collections::BTreeMap;

use campaign_core::config::TrendThresholds;
use campaign_core::types::{round2, MeasuredRecord, Metric, RawRecord};
use serde::Serialize;

use crate::measure::{measure, month_index, month_label, series_by_campaign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthChange {
    pub from_month: String,
    pub to_month: String,
    pub previous_value: f64,
    pub current_value: f64,
    pub change_pct: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversionTrend {
    Growing,
    Declining,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CpaTrend {
    Improving,
    Deteriorating,
    Stable,
    /// First or last month had no conversions.
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendStrength {
    Strong,
    Moderate,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthTrend {
    pub campaign_name: String,
    pub campaign_type: Option<String>,
    pub conversion_trend: ConversionTrend,
    pub cpa_trend: CpaTrend,
    pub trend_strength: TrendStrength,
    pub first_month_conversions: f64,
    pub last_month_conversions: f64,
    pub first_month_cpa: Option<f64>,
    pub last_month_cpa: Option<f64>,
    pub total_months: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthPerformance {
    pub month: String,
    pub total_conversions: f64,
    pub total_spend: f64,
    pub cpa: Option<f64>,
    pub campaigns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalPattern {
    pub monthly_breakdown: Vec<MonthPerformance>,
    pub peak_month: String,
    pub peak_conversions: f64,
    pub low_month: String,
    pub low_conversions: f64,
    pub average_conversions: f64,
    pub seasonality_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stability {
    Unstable,
    Moderate,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignVolatility {
    pub campaign_name: String,
    pub cpa_volatility: f64,
    pub cvr_volatility: f64,
    pub stability: Stability,
    pub months: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendReport {
    pub conversions_mom: Vec<MonthChange>,
    pub cost_mom: Vec<MonthChange>,
    pub growth_trends: Vec<GrowthTrend>,
    pub seasonality: Option<SeasonalPattern>,
    pub volatility: Vec<CampaignVolatility>,
}

pub struct TrendAnalyzer {
    thresholds: TrendThresholds,
}

impl TrendAnalyzer {
    pub fn new(thresholds: &TrendThresholds) -> Self {
        Self {
            thresholds: thresholds.clone(),
        }
    }

    pub fn analyze(&self, rows: &[MeasuredRecord]) -> TrendReport {
        TrendReport {
            conversions_mom: self.month_over_month(rows, Metric::Conversions),
            cost_mom: self.month_over_month(rows, Metric::Cost),
            growth_trends: self.growth_trends(rows),
            seasonality: self.seasonal_patterns(rows),
            volatility: self.volatility(rows),
        }
    }

    /// Change of `metric` between consecutive months. Rates are recomputed
    /// from each month's summed counters.
    pub fn month_over_month(&self, rows: &[MeasuredRecord], metric: Metric) -> Vec<MonthChange> {
        let months = month_totals(rows);
        months
            .windows(2)
            .map(|pair| {
                let (prev, curr) = (&pair[0], &pair[1]);
                let previous_value = prev.value(metric).unwrap_or(0.0);
                let current_value = curr.value(metric).unwrap_or(0.0);
                let change_pct = if previous_value > 0.0 {
                    (current_value - previous_value) / previous_value * 100.0
                } else if current_value == 0.0 {
                    0.0
                } else {
                    100.0
                };
                MonthChange {
                    from_month: month_label(prev),
                    to_month: month_label(curr),
                    previous_value: round2(previous_value),
                    current_value: round2(current_value),
                    change_pct: round2(change_pct),
                    direction: if change_pct > 0.0 {
                        Direction::Up
                    } else if change_pct < 0.0 {
                        Direction::Down
                    } else {
                        Direction::Flat
                    },
                }
            })
            .collect()
    }

    pub fn growth_trends(&self, rows: &[MeasuredRecord]) -> Vec<GrowthTrend> {
        let mut out = Vec::new();
        for (campaign, series) in series_by_campaign(rows) {
            let (Some(first), Some(last)) = (series.first(), series.last()) else {
                continue;
            };
            if series.len() < 2 {
                continue;
            }
            let first_conv = first.counters().conversions;
            let last_conv = last.counters().conversions;
            let conversion_trend = if last_conv > first_conv {
                ConversionTrend::Growing
            } else if last_conv < first_conv {
                ConversionTrend::Declining
            } else {
                ConversionTrend::Flat
            };
            let cpa_trend = match (first.metrics.cpa, last.metrics.cpa) {
                (Some(a), Some(b)) if b < a => CpaTrend::Improving,
                (Some(a), Some(b)) if b > a => CpaTrend::Deteriorating,
                (Some(_), Some(_)) => CpaTrend::Stable,
                _ => CpaTrend::Undefined,
            };

            let conversions: Vec<f64> = series.iter().map(|r| r.counters().conversions).collect();
            let (head, tail) = conversions.split_at(conversions.len() / 2);
            let (head_mean, tail_mean) = (mean(head), mean(tail));
            let delta = (tail_mean - head_mean).abs();
            let trend_strength = if delta > head_mean * self.thresholds.strong_trend_ratio {
                TrendStrength::Strong
            } else if delta > 0.0 {
                TrendStrength::Moderate
            } else {
                TrendStrength::Flat
            };

            out.push(GrowthTrend {
                campaign_name: campaign.to_string(),
                campaign_type: first.record.campaign_type.clone(),
                conversion_trend,
                cpa_trend,
                trend_strength,
                first_month_conversions: first_conv,
                last_month_conversions: last_conv,
                first_month_cpa: first.metrics.cpa.map(round2),
                last_month_cpa: last.metrics.cpa.map(round2),
                total_months: series.len(),
            });
        }
        out
    }

    /// Peak and low months by total conversions. Ties keep the earlier month.
    pub fn seasonal_patterns(&self, rows: &[MeasuredRecord]) -> Option<SeasonalPattern> {
        let mut campaigns_per_month: BTreeMap<Option<i32>, usize> = BTreeMap::new();
        for r in rows {
            *campaigns_per_month.entry(month_index(r)).or_insert(0) += 1;
        }
        let breakdown: Vec<MonthPerformance> = month_totals(rows)
            .iter()
            .map(|m| MonthPerformance {
                month: month_label(m),
                total_conversions: m.counters().conversions,
                total_spend: round2(m.counters().cost),
                cpa: m.metrics.cpa.map(round2),
                campaigns: campaigns_per_month.get(&month_index(m)).copied().unwrap_or(0),
            })
            .collect();

        let mut peak = breakdown.first()?;
        let mut low = peak;
        for m in &breakdown[1..] {
            if m.total_conversions > peak.total_conversions {
                peak = m;
            }
            if m.total_conversions < low.total_conversions {
                low = m;
            }
        }
        let conversions: Vec<f64> = breakdown.iter().map(|m| m.total_conversions).collect();

        Some(SeasonalPattern {
            peak_month: peak.month.clone(),
            peak_conversions: peak.total_conversions,
            low_month: low.month.clone(),
            low_conversions: low.total_conversions,
            average_conversions: round2(mean(&conversions)),
            seasonality_ratio: round2(peak.total_conversions / low.total_conversions.max(1.0)),
            monthly_breakdown: breakdown,
        })
    }

    /// Coefficient of variation (population) of CPA and conversion rate.
    /// Months with undefined CPA are left out of the CPA series.
    pub fn volatility(&self, rows: &[MeasuredRecord]) -> Vec<CampaignVolatility> {
        let t = &self.thresholds;
        series_by_campaign(rows)
            .into_iter()
            .filter(|(_, series)| series.len() >= 2)
            .map(|(campaign, series)| {
                let cpas: Vec<f64> = series.iter().filter_map(|r| r.metrics.cpa).collect();
                let cvrs: Vec<f64> = series.iter().map(|r| r.metrics.conversion_rate).collect();
                let cpa_volatility = coefficient_of_variation(&cpas);
                let stability = if cpa_volatility > t.unstable_volatility_pct {
                    Stability::Unstable
                } else if cpa_volatility > t.moderate_volatility_pct {
                    Stability::Moderate
                } else {
                    Stability::Stable
                };
                CampaignVolatility {
                    campaign_name: campaign.to_string(),
                    cpa_volatility: round2(cpa_volatility),
                    cvr_volatility: round2(coefficient_of_variation(&cvrs)),
                    stability,
                    months: series.len(),
                }
            })
            .collect()
    }
}

/// One measured record per month holding that month's summed counters.
fn month_totals(rows: &[MeasuredRecord]) -> Vec<MeasuredRecord> {
    let mut months: BTreeMap<Option<i32>, RawRecord> = BTreeMap::new();
    for r in rows {
        months
            .entry(month_index(r))
            .and_modify(|acc| acc.counters.accumulate(r.counters()))
            .or_insert_with(|| RawRecord {
                campaign_name: String::new(),
                month: r.record.month.clone(),
                counters: *r.counters(),
                ..Default::default()
            });
    }
    months.into_values().map(measure).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m <= 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / m * 100.0
}
