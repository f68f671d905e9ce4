//! Keyword recommendation synthesis.
//!
//! Every upstream record (audit issue, match-type change, lost-demand item,
//! new-keyword opportunity) becomes exactly one [`Recommendation`] with a
//! deterministic impact projection. Projections combine the record's own
//! volume with the injected [`RoiAssumptions`].

use campaign_core::config::RoiAssumptions;
use campaign_core::types::{
    round2, sort_recommendations, Confidence, ImpactEstimate, Issue, IssueType, Priority,
    Recommendation, RecommendationSource,
};
use campaign_keywords::lost_demand::LostDemand;
use campaign_keywords::market::KeywordOpportunity;
use campaign_keywords::match_type::{MatchTypeChange, MatchTypeRecommendation};
use serde::Serialize;
use tracing::debug;

/// CTR a dead keyword should reach after copy or match-type fixes.
const TARGET_RECOVERY_CTR: f64 = 0.03;
/// CTR target for low-CTR keywords.
const TARGET_IMPROVED_CTR: f64 = 0.015;
/// Conversion rate assumed once a leaking landing page is fixed.
const LANDING_PAGE_CONVERSION_RATE: f64 = 0.03;
/// Share of wasted click spend recovered by landing-page or negative-keyword work.
const LEAK_SAVINGS_SHARE: f64 = 0.5;
/// CPA reduction targeted for high-CPA keywords (midpoint of 20-30%).
const CPA_REDUCTION: f64 = 0.25;
/// CPC reduction from a tighter match type.
const MATCH_TYPE_CPC_REDUCTION: f64 = 0.20;
/// Conversion-rate lift from a tighter match type.
const MATCH_TYPE_CONVERSION_LIFT: f64 = 0.25;
/// Click-through expected on recovered searches.
const RECOVERED_SEARCH_CTR: f64 = 0.20;
/// Click-through expected on a freshly added keyword.
const NEW_KEYWORD_CTR: f64 = 0.15;
/// New keywords convert below baseline until they mature.
const NEW_KEYWORD_CONVERSION_FACTOR: f64 = 0.8;
const LOW_ROAS_SAVINGS_SHARE: f64 = 0.2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecommendationSummary {
    pub total_recommendations: usize,
    pub critical_priority: usize,
    pub high_priority: usize,
    pub medium_priority: usize,
    pub low_priority: usize,
    pub high_confidence: usize,
}

impl RecommendationSummary {
    pub fn of(recs: &[Recommendation]) -> Self {
        let count = |p: Priority| recs.iter().filter(|r| r.priority == p).count();
        Self {
            total_recommendations: recs.len(),
            critical_priority: count(Priority::Critical),
            high_priority: count(Priority::High),
            medium_priority: count(Priority::Medium),
            low_priority: count(Priority::Low),
            high_confidence: recs
                .iter()
                .filter(|r| r.confidence == Confidence::High)
                .count(),
        }
    }
}

pub struct RecommendationSynthesizer {
    assumptions: RoiAssumptions,
    currency: String,
}

impl RecommendationSynthesizer {
    pub fn new(assumptions: RoiAssumptions, currency: impl Into<String>) -> Self {
        Self {
            assumptions,
            currency: currency.into(),
        }
    }

    /// One recommendation per input record, sorted by (priority, confidence).
    pub fn synthesize<'a>(
        &self,
        issues: &[Issue],
        match_types: &[MatchTypeRecommendation],
        lost_demand: impl IntoIterator<Item = &'a LostDemand>,
        opportunities: &[KeywordOpportunity],
    ) -> Vec<Recommendation> {
        let mut recs: Vec<Recommendation> = issues.iter().map(|i| self.from_issue(i)).collect();
        recs.extend(match_types.iter().map(|m| self.from_match_type(m)));
        recs.extend(lost_demand.into_iter().map(|l| self.from_lost_demand(l)));
        recs.extend(opportunities.iter().map(|o| self.from_opportunity(o)));
        sort_recommendations(&mut recs);
        debug!(recommendations = recs.len(), "keyword recommendations synthesized");
        recs
    }

    fn money(&self, amount: f64) -> String {
        format!("{} {:.0}", self.currency, amount)
    }

    /// Whole conversions from an expected click count.
    fn conversions(&self, clicks: u64, rate: f64) -> u64 {
        (clicks as f64 * rate).floor() as u64
    }

    pub fn from_issue(&self, issue: &Issue) -> Recommendation {
        let a = &self.assumptions;
        let v = &issue.volume;
        let base = |problem: String,
                    action: &str,
                    detail: &str,
                    priority: Priority,
                    confidence: Confidence,
                    expected_impact: &str,
                    estimate: ImpactEstimate| Recommendation {
            subject: issue.subject.clone(),
            campaign_name: issue.campaign_name.clone(),
            source: RecommendationSource::AuditIssue,
            problem,
            action: action.to_string(),
            detail: detail.to_string(),
            priority,
            confidence,
            expected_impact: expected_impact.to_string(),
            estimate: Some(estimate),
        };

        match issue.issue_type {
            IssueType::NoClicks => {
                let clicks = (v.impressions as f64 * TARGET_RECOVERY_CTR).floor() as u64;
                let conversions = self.conversions(clicks, a.baseline_conversion_rate);
                base(
                    format!("High impressions ({}) but zero clicks", v.impressions),
                    "CONVERT_TO_EXACT_OR_PAUSE",
                    "Improve ad copy or convert to exact match to increase relevance",
                    Priority::High,
                    Confidence::High,
                    "Increase CTR by 2-3%",
                    ImpactEstimate {
                        estimated_clicks: Some(clicks),
                        estimated_conversions: Some(conversions),
                        revenue_impact: Some(round2(conversions as f64 * a.avg_order_value)),
                        roi_range: Some("250-400%".to_string()),
                        ..Default::default()
                    },
                )
            }
            IssueType::NoConversions => {
                let conversions = self.conversions(v.clicks, LANDING_PAGE_CONVERSION_RATE);
                base(
                    format!("Getting {} clicks but zero conversions", v.clicks),
                    "REVIEW_LANDING_PAGE",
                    "Review landing page relevance or add negative keywords",
                    Priority::High,
                    Confidence::Medium,
                    "Improve conversion rate",
                    ImpactEstimate {
                        estimated_clicks: Some(v.clicks),
                        estimated_conversions: Some(conversions),
                        revenue_impact: Some(round2(conversions as f64 * a.avg_order_value)),
                        cost_savings: Some(round2(v.clicks as f64 * a.avg_cpc * LEAK_SAVINGS_SHARE)),
                        roi_range: Some("150-300%".to_string()),
                        ..Default::default()
                    },
                )
            }
            IssueType::HighCpa => base(
                format!(
                    "High cost per acquisition: {} {:.2}",
                    self.currency,
                    issue.metrics.cpa.unwrap_or(issue.value)
                ),
                "REDUCE_BID_OR_PAUSE",
                "Tighten targeting or improve landing page relevance",
                Priority::Medium,
                Confidence::High,
                "Lower CPA by 20-30%",
                ImpactEstimate {
                    cost_savings: Some(round2(v.cost * CPA_REDUCTION)),
                    roi_range: Some("20-30%".to_string()),
                    ..Default::default()
                },
            ),
            IssueType::LowCtr => {
                let current = issue.metrics.ctr / 100.0;
                let lift = (TARGET_IMPROVED_CTR - current).max(0.0);
                let clicks = (v.impressions as f64 * lift).floor() as u64;
                let conversions = self.conversions(clicks, a.baseline_conversion_rate);
                base(
                    format!("Low click-through rate: {:.2}%", issue.metrics.ctr),
                    "IMPROVE_AD_COPY",
                    "Improve ad copy to match keyword intent",
                    Priority::Medium,
                    Confidence::High,
                    "Increase CTR by 1-2%",
                    ImpactEstimate {
                        estimated_clicks: Some(clicks),
                        estimated_conversions: Some(conversions),
                        revenue_impact: Some(round2(conversions as f64 * a.avg_order_value)),
                        roi_range: Some("100-200%".to_string()),
                        ..Default::default()
                    },
                )
            }
            IssueType::LowConversionRate => {
                let target = self.conversions(v.clicks, a.baseline_conversion_rate);
                let gained = target.saturating_sub(v.conversions.floor() as u64);
                base(
                    format!("Low conversion rate: {:.2}%", issue.metrics.conversion_rate),
                    "OPTIMIZE_LANDING_PAGE",
                    "Audit the landing page and reduce booking friction",
                    Priority::Medium,
                    Confidence::Medium,
                    "Raise conversion rate toward baseline",
                    ImpactEstimate {
                        estimated_conversions: Some(gained),
                        revenue_impact: Some(round2(gained as f64 * a.avg_order_value)),
                        roi_range: Some("50-150%".to_string()),
                        ..Default::default()
                    },
                )
            }
            IssueType::LowRoas => base(
                format!("Low return on ad spend: {:.2}x", issue.metrics.roas),
                "REVIEW_PRICING_OR_TRACKING",
                "Verify conversion value tracking and review pricing against the market",
                Priority::Medium,
                Confidence::Medium,
                "Bring ROAS above break-even",
                ImpactEstimate {
                    cost_savings: Some(round2(v.cost * LOW_ROAS_SAVINGS_SHARE)),
                    roi_range: Some("20-50%".to_string()),
                    ..Default::default()
                },
            ),
            IssueType::HighSpendLowReturn => base(
                format!(
                    "High spend ({}) with minimal conversions ({:.0})",
                    self.money(v.cost),
                    v.conversions
                ),
                "PAUSE_OR_RESTRUCTURE",
                "Pause or restructure with tighter targeting",
                Priority::High,
                Confidence::High,
                "Stop wasted spend",
                ImpactEstimate {
                    cost_savings: Some(round2(v.cost * LEAK_SAVINGS_SHARE)),
                    roi_range: Some("100-200%".to_string()),
                    ..Default::default()
                },
            ),
        }
    }

    pub fn from_match_type(&self, rec: &MatchTypeRecommendation) -> Recommendation {
        let a = &self.assumptions;
        let clicks = rec.volume.clicks;
        let savings = clicks as f64 * a.avg_cpc * MATCH_TYPE_CPC_REDUCTION;
        let conversions = self.conversions(
            clicks,
            a.baseline_conversion_rate * (1.0 + MATCH_TYPE_CONVERSION_LIFT),
        );
        let action = match rec.change {
            MatchTypeChange::LandingPageReview => "REVIEW_LANDING_PAGE".to_string(),
            _ => format!(
                "CONVERT_{}_TO_{}",
                action_label(rec.current_match_type.as_str()),
                action_label(rec.recommended_match_type.as_str())
            ),
        };
        Recommendation {
            subject: rec.keyword.clone(),
            campaign_name: rec.campaign_name.clone(),
            source: RecommendationSource::MatchType,
            problem: format!(
                "{} match not optimal",
                rec.current_match_type.as_str().to_uppercase()
            ),
            action,
            detail: rec.reason.clone(),
            priority: Priority::High,
            confidence: rec.confidence,
            expected_impact: rec.expected_impact.clone(),
            estimate: Some(ImpactEstimate {
                estimated_clicks: Some(clicks),
                estimated_conversions: Some(conversions),
                revenue_impact: Some(round2(conversions as f64 * a.avg_order_value)),
                cost_savings: Some(round2(savings)),
                roi_range: Some("150-250%".to_string()),
                ..Default::default()
            }),
        }
    }

    pub fn from_lost_demand(&self, lost: &LostDemand) -> Recommendation {
        let a = &self.assumptions;
        let clicks = (lost.volume as f64 * RECOVERED_SEARCH_CTR).floor() as u64;
        let conversions = self.conversions(clicks, a.baseline_conversion_rate);
        Recommendation {
            subject: lost.subject.clone(),
            campaign_name: lost
                .campaign_name
                .clone()
                .unwrap_or_else(|| "Portfolio".to_string()),
            source: RecommendationSource::LostDemand,
            problem: lost.description.clone(),
            action: "FIX_COVERAGE_GAP".to_string(),
            detail: lost.recommendation.clone(),
            priority: Priority::High,
            confidence: Confidence::High,
            expected_impact: format!("Recover {} searches", lost.volume),
            estimate: Some(ImpactEstimate {
                estimated_clicks: Some(clicks),
                estimated_conversions: Some(conversions),
                revenue_impact: Some(round2(conversions as f64 * a.avg_order_value)),
                roi_range: Some("300-500%".to_string()),
                ..Default::default()
            }),
        }
    }

    pub fn from_opportunity(&self, opp: &KeywordOpportunity) -> Recommendation {
        let a = &self.assumptions;
        let searches = opp.estimated_monthly_searches;
        let clicks = (searches as f64 * NEW_KEYWORD_CTR).floor() as u64;
        let conversions = self.conversions(
            clicks,
            a.baseline_conversion_rate * NEW_KEYWORD_CONVERSION_FACTOR,
        );
        Recommendation {
            subject: opp.suggested_keyword.clone(),
            campaign_name: "New keyword".to_string(),
            source: RecommendationSource::NewKeyword,
            problem: "Missed high-intent searches".to_string(),
            action: "ADD_NEW_KEYWORD".to_string(),
            detail: format!(
                "Add '{}' to capture {}",
                opp.suggested_keyword,
                opp.intent.to_lowercase()
            ),
            priority: opp.priority,
            confidence: Confidence::Medium,
            expected_impact: format!("Increase reach by ~{searches} monthly searches"),
            estimate: Some(ImpactEstimate {
                estimated_clicks: Some(clicks),
                estimated_conversions: Some(conversions),
                revenue_impact: Some(round2(conversions as f64 * a.avg_order_value)),
                estimated_cost: Some(round2(clicks as f64 * a.avg_cpc)),
                roi_range: Some("80-120%".to_string()),
                ..Default::default()
            }),
        }
    }
}

fn action_label(match_type: &str) -> String {
    match_type.to_uppercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::config::LostDemandConfig;
    use campaign_core::types::{Counters, MatchType, Metrics, Severity};
    use campaign_keywords::lost_demand::{LostDemandDetector, LostDemandKind};

    fn synthesizer() -> RecommendationSynthesizer {
        RecommendationSynthesizer::new(RoiAssumptions::default(), "AED")
    }

    fn issue(issue_type: IssueType, counters: Counters) -> Issue {
        Issue {
            subject: "dry cleaning".to_string(),
            campaign_name: "Search".to_string(),
            match_type: Some(MatchType::Broad),
            issue_type,
            severity: Severity::High,
            description: String::new(),
            value: 0.0,
            volume: counters,
            metrics: Metrics::default(),
        }
    }

    fn lost(volume: u64) -> LostDemand {
        LostDemand {
            subject: "carpet cleaning".to_string(),
            campaign_name: None,
            match_type: None,
            kind: LostDemandKind::UncoveredHighIntent,
            severity: Severity::High,
            description: "High-intent phrase not covered".to_string(),
            recommendation: "Add keyword".to_string(),
            volume,
            counters: None,
        }
    }

    #[test]
    fn test_no_clicks_projection() {
        let rec = synthesizer().from_issue(&issue(IssueType::NoClicks, Counters::new(1000, 0, 0.0, 0.0)));
        let est = rec.estimate.unwrap();
        assert_eq!(rec.action, "CONVERT_TO_EXACT_OR_PAUSE");
        assert_eq!(est.estimated_clicks, Some(30));
        assert_eq!(est.estimated_conversions, Some(1));
        assert_eq!(est.revenue_impact, Some(200.0));
    }

    #[test]
    fn test_assumptions_drive_projection() {
        let custom = RecommendationSynthesizer::new(
            RoiAssumptions {
                avg_cpc: 4.0,
                baseline_conversion_rate: 0.1,
                avg_order_value: 500.0,
            },
            "AED",
        );
        let rec = custom.from_issue(&issue(IssueType::NoConversions, Counters::new(500, 40, 80.0, 0.0)));
        let est = rec.estimate.unwrap();
        assert_eq!(est.estimated_conversions, Some(1));
        assert_eq!(est.revenue_impact, Some(500.0));
        assert_eq!(est.cost_savings, Some(80.0));
    }

    #[test]
    fn test_one_recommendation_per_record_sorted() {
        let s = synthesizer();
        let issues = [
            issue(IssueType::LowCtr, Counters::new(1000, 5, 10.0, 0.0)),
            issue(IssueType::NoClicks, Counters::new(1000, 0, 0.0, 0.0)),
        ];
        let opportunity = KeywordOpportunity {
            suggested_keyword: "express laundry".to_string(),
            intent: "High-intent same-day laundry searches".to_string(),
            recommended_match_type: MatchType::Exact,
            estimated_monthly_searches: 50,
            priority: Priority::Low,
            reason: String::new(),
            action: String::new(),
        };
        let lost_items = [lost(200)];
        let recs = s.synthesize(&issues, &[], lost_items.iter(), &[opportunity]);
        assert_eq!(recs.len(), 4);
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(recs[0].source, RecommendationSource::AuditIssue);
        assert_eq!(recs[1].source, RecommendationSource::LostDemand);
        assert_eq!(recs[2].action, "IMPROVE_AD_COPY");
        assert_eq!(recs[3].source, RecommendationSource::NewKeyword);
    }

    #[test]
    fn test_lost_demand_without_campaign() {
        let rec = synthesizer().from_lost_demand(&lost(200));
        assert_eq!(rec.campaign_name, "Portfolio");
        assert_eq!(rec.expected_impact, "Recover 200 searches");
        let est = rec.estimate.unwrap();
        assert_eq!(est.estimated_clicks, Some(40));
        assert_eq!(est.estimated_conversions, Some(2));
    }

    #[test]
    fn test_uncovered_phrase_uses_baseline_searches() {
        let config = LostDemandConfig::default();
        let gaps = LostDemandDetector::new(&config).high_intent_gaps(&[]);
        assert!(!gaps.is_empty());
        let rec = synthesizer().from_lost_demand(&gaps[0]);
        assert_eq!(rec.expected_impact, "Recover 50 searches");
        assert_eq!(rec.estimate.unwrap().estimated_clicks, Some(10));
    }

    #[test]
    fn test_summary_counts() {
        let s = synthesizer();
        let issues = [
            issue(IssueType::NoClicks, Counters::new(1000, 0, 0.0, 0.0)),
            issue(IssueType::HighCpa, Counters::new(1000, 50, 700.0, 1.0)),
        ];
        let recs = s.synthesize(&issues, &[], std::iter::empty(), &[]);
        let summary = RecommendationSummary::of(&recs);
        assert_eq!(summary.total_recommendations, 2);
        assert_eq!(summary.high_priority, 1);
        assert_eq!(summary.medium_priority, 1);
        assert_eq!(summary.high_confidence, 2);
    }
}
