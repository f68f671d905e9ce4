//! Lost-demand detection: traffic that was paid for or searched but never
//! turned into engagement, and high-intent searches the portfolio misses.

use std::collections::BTreeMap;

use campaign_core::config::LostDemandConfig;
use campaign_core::types::{Counters, MatchType, MeasuredRecord, Severity};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LostDemandKind {
    ImpressionNoEngagement,
    ClickNoConversion,
    MissingExact,
    MissingExactFromPhrase,
    HighCtrNoConversion,
    ExactMatchLowCtr,
    UncoveredHighIntent,
    InsufficientCoverage,
}

impl LostDemandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ImpressionNoEngagement => "IMPRESSION_NO_ENGAGEMENT",
            Self::ClickNoConversion => "CLICK_NO_CONVERSION",
            Self::MissingExact => "MISSING_EXACT",
            Self::MissingExactFromPhrase => "MISSING_EXACT_FROM_PHRASE",
            Self::HighCtrNoConversion => "HIGH_CTR_NO_CONVERSION",
            Self::ExactMatchLowCtr => "EXACT_MATCH_LOW_CTR",
            Self::UncoveredHighIntent => "UNCOVERED_HIGH_INTENT",
            Self::InsufficientCoverage => "INSUFFICIENT_COVERAGE",
        }
    }
}

/// One lost-demand observation. `subject` is a keyword, or an intent phrase
/// for the portfolio-level coverage gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LostDemand {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
    pub kind: LostDemandKind,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
    /// Searches, clicks or impressions behind the finding.
    pub volume: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<Counters>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LostDemandReport {
    pub lost_searches: Vec<LostDemand>,
    pub match_type_gaps: Vec<LostDemand>,
    pub intent_mismatches: Vec<LostDemand>,
    pub high_intent_gaps: Vec<LostDemand>,
}

impl LostDemandReport {
    /// Records that feed the recommendation list, in report order.
    /// Intent mismatches are diagnostic only.
    pub fn actionable(&self) -> impl Iterator<Item = &LostDemand> {
        self.lost_searches
            .iter()
            .chain(&self.match_type_gaps)
            .chain(&self.high_intent_gaps)
    }

    pub fn total(&self) -> usize {
        self.lost_searches.len()
            + self.match_type_gaps.len()
            + self.intent_mismatches.len()
            + self.high_intent_gaps.len()
    }
}

pub struct LostDemandDetector {
    config: LostDemandConfig,
}

impl LostDemandDetector {
    pub fn new(config: &LostDemandConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn detect(&self, rows: &[MeasuredRecord]) -> LostDemandReport {
        let report = LostDemandReport {
            lost_searches: self.lost_searches(rows),
            match_type_gaps: self.match_type_gaps(rows),
            intent_mismatches: self.intent_mismatches(rows),
            high_intent_gaps: self.high_intent_gaps(rows),
        };
        debug!(findings = report.total(), "lost demand detection complete");
        report
    }

    /// Impression waste first, then funnel leaks.
    pub fn lost_searches(&self, rows: &[MeasuredRecord]) -> Vec<LostDemand> {
        let cfg = &self.config;
        let waste = rows
            .iter()
            .filter(|r| {
                r.counters().impressions > cfg.waste_min_impressions
                    && r.metrics.ctr < cfg.waste_max_ctr
            })
            .map(|r| {
                let impressions = r.counters().impressions;
                // impressions * (1 - ctr)
                let lost = impressions.saturating_sub(r.counters().clicks);
                keyword_finding(
                    r,
                    LostDemandKind::ImpressionNoEngagement,
                    Severity::High,
                    format!(
                        "Getting {impressions} impressions but CTR only {:.2}% - users not clicking",
                        r.metrics.ctr
                    ),
                    "Improve ad copy relevance or consider exact-match conversion".to_string(),
                    lost,
                )
            });
        let leaks = rows
            .iter()
            .filter(|r| {
                r.counters().clicks > cfg.leak_min_clicks && r.counters().conversions == 0.0
            })
            .map(|r| {
                let clicks = r.counters().clicks;
                keyword_finding(
                    r,
                    LostDemandKind::ClickNoConversion,
                    Severity::High,
                    format!("Getting {clicks} clicks but zero conversions - funnel issue"),
                    "Check landing page relevance or adjust targeting".to_string(),
                    clicks,
                )
            });
        waste.chain(leaks).collect()
    }

    /// Keywords running broad or phrase with real traffic but no exact
    /// sibling. Keywords are visited in sorted order.
    pub fn match_type_gaps(&self, rows: &[MeasuredRecord]) -> Vec<LostDemand> {
        let min_clicks = self.config.exact_sibling_min_clicks;
        let mut by_keyword: BTreeMap<&str, Vec<&MeasuredRecord>> = BTreeMap::new();
        for r in rows {
            by_keyword.entry(r.subject()).or_default().push(r);
        }

        let mut out = Vec::new();
        for (keyword, group) in by_keyword {
            let first_of = |mt: MatchType| {
                group
                    .iter()
                    .copied()
                    .find(|r| r.record.match_type.as_ref() == Some(&mt))
            };
            if first_of(MatchType::Exact).is_some() {
                continue;
            }
            let with_traffic = |r: &&MeasuredRecord| r.counters().clicks > min_clicks;
            if let Some(broad) = first_of(MatchType::Broad).filter(with_traffic) {
                let clicks = broad.counters().clicks;
                out.push(keyword_finding(
                    broad,
                    LostDemandKind::MissingExact,
                    Severity::High,
                    format!("Broad match getting {clicks} clicks but no Exact variant"),
                    format!("Add Exact match variant of '{keyword}'"),
                    clicks,
                ));
            }
            if let Some(phrase) = first_of(MatchType::Phrase).filter(with_traffic) {
                let clicks = phrase.counters().clicks;
                out.push(keyword_finding(
                    phrase,
                    LostDemandKind::MissingExactFromPhrase,
                    Severity::Medium,
                    format!("Phrase match getting {clicks} clicks but no Exact variant"),
                    format!("Add Exact match variant of '{keyword}' for better intent matching"),
                    clicks,
                ));
            }
        }
        out
    }

    pub fn intent_mismatches(&self, rows: &[MeasuredRecord]) -> Vec<LostDemand> {
        let cfg = &self.config;
        let mut out = Vec::new();
        for r in rows {
            let c = r.counters();
            if r.metrics.ctr > cfg.intent_mismatch_ctr
                && c.conversions == 0.0
                && c.clicks > cfg.intent_mismatch_min_clicks
            {
                out.push(keyword_finding(
                    r,
                    LostDemandKind::HighCtrNoConversion,
                    Severity::High,
                    format!(
                        "Users clicking (CTR: {:.2}%) but not converting - landing page mismatch",
                        r.metrics.ctr
                    ),
                    "Review landing page relevance or service match".to_string(),
                    c.clicks,
                ));
            }
            if r.record.match_type == Some(MatchType::Exact)
                && r.metrics.ctr < cfg.exact_low_ctr
                && c.impressions > cfg.exact_low_ctr_min_impressions
            {
                out.push(keyword_finding(
                    r,
                    LostDemandKind::ExactMatchLowCtr,
                    Severity::Medium,
                    format!(
                        "Exact match keyword with {:.2}% CTR - ad copy may not match intent",
                        r.metrics.ctr
                    ),
                    "Improve ad copy to match keyword intent".to_string(),
                    c.impressions,
                ));
            }
        }
        out
    }

    /// Configured high-intent phrases that no keyword contains, or that
    /// draw too few impressions.
    pub fn high_intent_gaps(&self, rows: &[MeasuredRecord]) -> Vec<LostDemand> {
        let cfg = &self.config;
        let mut out = Vec::new();
        for phrase in &cfg.high_intent_phrases {
            let needle = phrase.to_lowercase();
            let matching: Vec<&MeasuredRecord> = rows
                .iter()
                .filter(|r| r.subject().to_lowercase().contains(&needle))
                .collect();
            let totals = Counters::total(matching.iter().map(|r| r.counters()));

            if matching.is_empty() {
                out.push(portfolio_finding(
                    phrase,
                    LostDemandKind::UncoveredHighIntent,
                    Severity::High,
                    format!("No keywords targeting high-intent '{phrase}' searches"),
                    format!("Add keywords targeting '{phrase}' as exact match"),
                    cfg.uncovered_phrase_searches,
                ));
            } else if totals.impressions < cfg.min_coverage_impressions {
                out.push(portfolio_finding(
                    phrase,
                    LostDemandKind::InsufficientCoverage,
                    Severity::Medium,
                    format!(
                        "Low impression volume ({}) for high-intent '{phrase}'",
                        totals.impressions
                    ),
                    format!("Increase bid or add more variants for '{phrase}'"),
                    totals.impressions,
                ));
            }
        }
        out
    }
}

fn keyword_finding(
    row: &MeasuredRecord,
    kind: LostDemandKind,
    severity: Severity,
    description: String,
    recommendation: String,
    volume: u64,
) -> LostDemand {
    LostDemand {
        subject: row.subject().to_string(),
        campaign_name: Some(row.record.campaign_name.clone()),
        match_type: row.record.match_type.clone(),
        kind,
        severity,
        description,
        recommendation,
        volume,
        counters: Some(*row.counters()),
    }
}

fn portfolio_finding(
    phrase: &str,
    kind: LostDemandKind,
    severity: Severity,
    description: String,
    recommendation: String,
    volume: u64,
) -> LostDemand {
    LostDemand {
        subject: phrase.to_string(),
        campaign_name: None,
        match_type: None,
        kind,
        severity,
        description,
        recommendation,
        volume,
        counters: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_analytics::measure::measure;
    use campaign_core::types::RawRecord;

    fn kw(text: &str, mt: MatchType, counters: Counters) -> MeasuredRecord {
        measure(RawRecord::keyword("Search", text, mt, counters))
    }

    fn detector() -> LostDemandDetector {
        LostDemandDetector::new(&LostDemandConfig::default())
    }

    fn kinds(items: &[LostDemand]) -> Vec<LostDemandKind> {
        items.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_impression_waste_and_funnel_leak() {
        let rows = [
            kw("dry cleaning", MatchType::Broad, Counters::new(200, 1, 5.0, 0.0)),
            kw("ironing", MatchType::Phrase, Counters::new(100, 20, 40.0, 0.0)),
        ];
        let lost = detector().lost_searches(&rows);
        assert_eq!(
            kinds(&lost),
            vec![LostDemandKind::ImpressionNoEngagement, LostDemandKind::ClickNoConversion]
        );
        assert_eq!(lost[0].volume, 199);
        assert_eq!(lost[1].volume, 20);
    }

    #[test]
    fn test_missing_exact_siblings() {
        let rows = [
            kw("sofa cleaning", MatchType::Broad, Counters::new(100, 6, 5.0, 0.0)),
            kw("sofa cleaning", MatchType::Phrase, Counters::new(100, 8, 5.0, 0.0)),
            kw("carpet cleaning", MatchType::Broad, Counters::new(100, 50, 5.0, 0.0)),
            kw("carpet cleaning", MatchType::Exact, Counters::new(100, 5, 5.0, 0.0)),
            kw("rug", MatchType::Broad, Counters::new(100, 5, 5.0, 0.0)),
        ];
        let gaps = detector().match_type_gaps(&rows);
        assert_eq!(
            kinds(&gaps),
            vec![LostDemandKind::MissingExact, LostDemandKind::MissingExactFromPhrase]
        );
        assert_eq!(gaps[0].severity, Severity::High);
        assert_eq!(gaps[1].severity, Severity::Medium);
        assert_eq!(gaps[0].recommendation, "Add Exact match variant of 'sofa cleaning'");
    }

    #[test]
    fn test_intent_mismatches() {
        let rows = [
            kw("curtains", MatchType::Broad, Counters::new(100, 10, 20.0, 0.0)),
            kw("laundry", MatchType::Exact, Counters::new(1000, 2, 2.0, 1.0)),
        ];
        let found = detector().intent_mismatches(&rows);
        assert_eq!(
            kinds(&found),
            vec![LostDemandKind::HighCtrNoConversion, LostDemandKind::ExactMatchLowCtr]
        );
    }

    #[test]
    fn test_high_intent_gaps() {
        let mut config = LostDemandConfig::default();
        config.high_intent_phrases = vec!["dry cleaning".into(), "book now".into(), "sofa cleaning".into()];
        let rows = [
            kw("dry cleaning dubai", MatchType::Exact, Counters::new(500, 10, 5.0, 1.0)),
            kw("sofa cleaning", MatchType::Exact, Counters::new(30, 1, 5.0, 0.0)),
        ];
        let gaps = LostDemandDetector::new(&config).high_intent_gaps(&rows);
        assert_eq!(
            kinds(&gaps),
            vec![LostDemandKind::UncoveredHighIntent, LostDemandKind::InsufficientCoverage]
        );
        assert_eq!(gaps[0].subject, "book now");
        assert_eq!(gaps[0].volume, 50);
        assert_eq!(gaps[1].volume, 30);
        assert!(gaps[0].campaign_name.is_none());
    }

    #[test]
    fn test_actionable_excludes_mismatches() {
        let rows = [kw("curtains", MatchType::Broad, Counters::new(100, 11, 20.0, 0.0))];
        let report = detector().detect(&rows);
        assert!(!report.intent_mismatches.is_empty());
        let actionable = report.actionable().count();
        assert_eq!(actionable, report.total() - report.intent_mismatches.len());
    }
}
