//! Match-type strategy: per-bucket performance and promotion/demotion rules.

use campaign_analytics::measure::derive;
use campaign_core::config::MatchTypeThresholds;
use campaign_core::types::{round2, Confidence, Counters, MatchType, MeasuredRecord, Metrics};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchTypePerformance {
    pub match_type: MatchType,
    pub keywords_count: usize,
    #[serde(flatten)]
    pub counters: Counters,
    #[serde(flatten)]
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchTypeChange {
    /// Converting well on a looser match type.
    PromoteToExact,
    /// Broad traffic that rarely clicks.
    NarrowToPhrase,
    /// Exact traffic that clicks but does not convert; no type change.
    LandingPageReview,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchTypeRecommendation {
    pub keyword: String,
    pub campaign_name: String,
    pub change: MatchTypeChange,
    pub current_match_type: MatchType,
    pub recommended_match_type: MatchType,
    pub reason: String,
    pub expected_impact: String,
    pub confidence: Confidence,
    pub action: String,
    pub volume: Counters,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BestBy {
    ConversionRate,
    Cpa,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestKeyword {
    pub match_type: MatchType,
    pub keyword: String,
    pub metric: BestBy,
    pub value: f64,
    pub conversions: f64,
}

pub struct MatchTypeOptimizer {
    thresholds: MatchTypeThresholds,
}

impl MatchTypeOptimizer {
    pub fn new(thresholds: &MatchTypeThresholds) -> Self {
        Self {
            thresholds: thresholds.clone(),
        }
    }

    /// Totals per match type in first-seen order, rates recomputed from sums.
    pub fn performance(&self, rows: &[MeasuredRecord]) -> Vec<MatchTypePerformance> {
        let mut buckets: Vec<(MatchType, usize, Counters)> = Vec::new();
        for row in rows {
            let Some(mt) = row.record.match_type.as_ref() else {
                continue;
            };
            match buckets.iter_mut().find(|(m, _, _)| m == mt) {
                Some((_, count, counters)) => {
                    *count += 1;
                    counters.accumulate(row.counters());
                }
                None => buckets.push((mt.clone(), 1, *row.counters())),
            }
        }
        buckets
            .into_iter()
            .map(|(match_type, keywords_count, counters)| MatchTypePerformance {
                match_type,
                keywords_count,
                metrics: derive(&counters),
                counters,
            })
            .collect()
    }

    /// Broad rows first, then phrase, then exact.
    pub fn recommend(&self, rows: &[MeasuredRecord]) -> Vec<MatchTypeRecommendation> {
        let t = &self.thresholds;
        let of_type = move |mt: MatchType| {
            rows.iter()
                .filter(move |r| r.record.match_type.as_ref() == Some(&mt))
        };
        let mut out = Vec::new();

        for row in of_type(MatchType::Broad) {
            let (c, m) = (row.counters(), &row.metrics);
            if c.clicks <= t.broad_min_clicks {
                continue;
            }
            if m.conversion_rate > t.broad_promote_conversion_rate {
                out.push(recommendation(
                    row,
                    MatchTypeChange::PromoteToExact,
                    MatchType::Exact,
                    format!(
                        "Broad match converting well (CVR: {:.2}%) - should be exact for better control",
                        m.conversion_rate
                    ),
                    "Higher conversion rate, better CPA",
                    Confidence::High,
                    "Convert to Exact match",
                ));
            } else if m.ctr < t.broad_narrow_ctr && c.impressions > t.broad_narrow_min_impressions {
                out.push(recommendation(
                    row,
                    MatchTypeChange::NarrowToPhrase,
                    MatchType::Phrase,
                    format!("Broad match getting low CTR ({:.2}%) - refine to Phrase", m.ctr),
                    "Better intent matching, higher CTR",
                    Confidence::High,
                    "Convert to Phrase match",
                ));
            }
        }

        for row in of_type(MatchType::Phrase) {
            let m = &row.metrics;
            if row.counters().clicks > t.phrase_min_clicks
                && m.conversion_rate > t.phrase_promote_conversion_rate
            {
                out.push(recommendation(
                    row,
                    MatchTypeChange::PromoteToExact,
                    MatchType::Exact,
                    format!(
                        "Phrase match converting well (CVR: {:.2}%) - should be exact",
                        m.conversion_rate
                    ),
                    "Better ROI, lower CPA",
                    Confidence::High,
                    "Convert to Exact match",
                ));
            }
        }

        for row in of_type(MatchType::Exact) {
            let m = &row.metrics;
            if row.counters().clicks > 0
                && m.conversion_rate < t.exact_landing_page_conversion_rate
                && m.ctr > t.exact_landing_page_ctr
            {
                out.push(recommendation(
                    row,
                    MatchTypeChange::LandingPageReview,
                    MatchType::Exact,
                    format!(
                        "Exact match with good CTR ({:.2}%) but low CVR - landing page issue",
                        m.ctr
                    ),
                    "Improved conversion rate",
                    Confidence::Medium,
                    "Check landing page relevance",
                ));
            }
        }

        debug!(recommendations = out.len(), "match type rules evaluated");
        out
    }

    /// Best keyword per match type by conversion rate and by CPA. Only
    /// keywords with conversions qualify; the first row wins ties.
    pub fn best_keywords(&self, rows: &[MeasuredRecord]) -> Vec<BestKeyword> {
        let mut out = Vec::new();
        for mt in [MatchType::Exact, MatchType::Phrase, MatchType::Broad] {
            let converting: Vec<&MeasuredRecord> = rows
                .iter()
                .filter(|r| r.record.match_type.as_ref() == Some(&mt))
                .filter(|r| r.counters().conversions > 0.0)
                .collect();

            let by_rate = converting
                .iter()
                .copied()
                .fold(None::<&MeasuredRecord>, |acc, r| match acc {
                    Some(b) if b.metrics.conversion_rate >= r.metrics.conversion_rate => Some(b),
                    _ => Some(r),
                });
            if let Some(r) = by_rate {
                out.push(best(r, &mt, BestBy::ConversionRate, r.metrics.conversion_rate));
            }

            let by_cpa = converting
                .iter()
                .filter_map(|r| r.metrics.cpa.map(|cpa| (*r, cpa)))
                .fold(None::<(&MeasuredRecord, f64)>, |acc, (r, cpa)| match acc {
                    Some((b, b_cpa)) if b_cpa <= cpa => Some((b, b_cpa)),
                    _ => Some((r, cpa)),
                });
            if let Some((r, cpa)) = by_cpa {
                out.push(best(r, &mt, BestBy::Cpa, cpa));
            }
        }
        out
    }
}

fn best(row: &MeasuredRecord, mt: &MatchType, metric: BestBy, value: f64) -> BestKeyword {
    BestKeyword {
        match_type: mt.clone(),
        keyword: row.subject().to_string(),
        metric,
        value: round2(value),
        conversions: row.counters().conversions,
    }
}

fn recommendation(
    row: &MeasuredRecord,
    change: MatchTypeChange,
    recommended: MatchType,
    reason: String,
    expected_impact: &str,
    confidence: Confidence,
    action: &str,
) -> MatchTypeRecommendation {
    MatchTypeRecommendation {
        keyword: row.subject().to_string(),
        campaign_name: row.record.campaign_name.clone(),
        change,
        current_match_type: row.record.match_type.clone().unwrap_or(MatchType::Broad),
        recommended_match_type: recommended,
        reason,
        expected_impact: expected_impact.to_string(),
        confidence,
        action: action.to_string(),
        volume: *row.counters(),
        metrics: row.metrics,
    }
}
