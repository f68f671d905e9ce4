//! Per-campaign advice for the campaign track.

use campaign_core::types::{
    Confidence, Issue, IssueType, MeasuredRecord, Priority, Recommendation, RecommendationSource,
    Severity,
};
use tracing::debug;

const ADVISORY_CONVERSION_RATE: f64 = 2.0;
const ADVISORY_CTR: f64 = 1.0;
const LARGE_BUDGET: f64 = 5000.0;
const UNDERFUNDED_BUDGET: f64 = 2000.0;
const EXCELLENT_ROAS: f64 = 2.0;

/// Produces exactly one recommendation per campaign: driven by the
/// campaign's highest-ranked issue, or a scaling suggestion when it has none.
pub struct CampaignAdvisor {
    currency: String,
}

impl CampaignAdvisor {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }

    /// `issues` must already be severity-sorted, as [`IssueDetector::detect`]
    /// returns them; the first issue per campaign is taken as primary.
    ///
    /// [`IssueDetector::detect`]: campaign_analytics::rules::IssueDetector::detect
    pub fn advise(&self, campaigns: &[MeasuredRecord], issues: &[Issue]) -> Vec<Recommendation> {
        let recs: Vec<Recommendation> = campaigns
            .iter()
            .map(|c| {
                let name = c.record.campaign_name.as_str();
                match issues.iter().find(|i| i.campaign_name == name) {
                    Some(primary) => self.for_issue(c, primary),
                    None => self.for_strong_performer(c),
                }
            })
            .collect();
        debug!(campaigns = campaigns.len(), "campaign advice generated");
        recs
    }

    fn for_issue(&self, campaign: &MeasuredRecord, issue: &Issue) -> Recommendation {
        let m = &campaign.metrics;
        let c = campaign.counters();
        let (problem, steps, confidence): (String, Vec<&str>, Confidence) = match issue.issue_type {
            IssueType::HighCpa => {
                let mut steps = Vec::new();
                if m.conversion_rate < ADVISORY_CONVERSION_RATE {
                    steps.push("Tighten targeting and audience segmentation to improve conversion rate");
                }
                if m.ctr < ADVISORY_CTR {
                    steps.push("Refresh ad copy and creative assets - CTR indicates poor ad relevance");
                }
                if c.cost > LARGE_BUDGET {
                    steps.push("Consider reallocating 20-30% of budget to better-performing campaigns");
                }
                if steps.is_empty() {
                    steps.push("Review landing page experience and improve conversion funnel");
                }
                (
                    format!(
                        "High Cost Per Acquisition: {} {:.2}",
                        self.currency,
                        m.cpa.unwrap_or(issue.value)
                    ),
                    steps,
                    Confidence::High,
                )
            }
            IssueType::LowCtr | IssueType::NoClicks => (
                format!("Low Click-Through Rate: {:.2}%", m.ctr),
                vec![
                    "Improve ad copy relevance with clearer messaging, stronger CTAs, and highlight unique value propositions",
                    "Test different ad formats and headlines",
                    "Ensure keywords match search intent tightly",
                ],
                Confidence::High,
            ),
            IssueType::LowConversionRate | IssueType::NoConversions => {
                let mut steps = vec!["Audit landing page for UX/design issues and slow load times"];
                if m.ctr < ADVISORY_CTR {
                    steps.push("First improve CTR by optimizing ad copy - quality matters before volume");
                }
                steps.push("Test different booking form layouts and reduce friction (fewer fields)");
                steps.push("Add trust signals: reviews, certifications, money-back guarantees");
                (
                    format!("Low Conversion Rate: {:.2}%", m.conversion_rate),
                    steps,
                    Confidence::High,
                )
            }
            IssueType::LowRoas => {
                let (problem, steps) = if m.roas > 0.0 {
                    (
                        format!("Low Return on Ad Spend: {:.2}", m.roas),
                        vec![
                            "Improve conversion rate first",
                            "Review service pricing - may be too high relative to market",
                        ],
                    )
                } else {
                    (
                        "No revenue tracked".to_string(),
                        vec![
                            "Verify revenue tracking is working correctly",
                            "Review conversion tracking setup",
                        ],
                    )
                };
                (problem, steps, Confidence::Medium)
            }
            IssueType::HighSpendLowReturn => (
                format!(
                    "High Spend ({} {:.2}) with Minimal Conversions ({})",
                    self.currency, c.cost, c.conversions
                ),
                vec![
                    "Pause underperforming ad groups and shift to high-performing variants",
                    "Conduct audience and keyword analysis to identify low-quality traffic",
                    "Consider restructuring as a retargeting campaign",
                    "Re-evaluate landing page or service offering",
                ],
                Confidence::High,
            ),
        };

        Recommendation {
            subject: campaign.record.campaign_name.clone(),
            campaign_name: campaign.record.campaign_name.clone(),
            source: RecommendationSource::CampaignIssue,
            problem,
            action: issue.issue_type.as_str().to_string(),
            detail: steps.join(" | "),
            priority: Priority::from(issue.severity),
            confidence,
            expected_impact: format!("Resolve {}", issue.issue_type),
            estimate: None,
        }
    }

    fn for_strong_performer(&self, campaign: &MeasuredRecord) -> Recommendation {
        let cost = campaign.counters().cost;
        let detail = if cost < UNDERFUNDED_BUDGET {
            format!(
                "Increase budget allocation - currently underfunded at {} {:.2}/month",
                self.currency, cost
            )
        } else if campaign.metrics.roas > EXCELLENT_ROAS {
            "Excellent ROAS - prioritize scaling this campaign for maximum return".to_string()
        } else {
            "Scale budget by 15-25% to expand reach while maintaining quality".to_string()
        };
        Recommendation {
            subject: campaign.record.campaign_name.clone(),
            campaign_name: campaign.record.campaign_name.clone(),
            source: RecommendationSource::CampaignPerformance,
            problem: "Strong performance detected".to_string(),
            action: "SCALE_BUDGET".to_string(),
            detail,
            priority: Priority::from(Severity::Low),
            confidence: Confidence::High,
            expected_impact: "More conversions at a stable CPA".to_string(),
            estimate: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_analytics::measure::by_campaign;
    use campaign_analytics::rules::{IssueDetector, RuleTable};
    use campaign_core::config::RuleThresholds;
    use campaign_core::types::{Counters, RawRecord};

    fn run(records: &[RawRecord]) -> Vec<Recommendation> {
        let campaigns = by_campaign(records);
        let detector = IssueDetector::new(RuleTable::campaign(&RuleThresholds::campaign()), "AED");
        let issues = detector.detect(&campaigns);
        CampaignAdvisor::new("AED").advise(&campaigns, &issues)
    }

    #[test]
    fn test_one_recommendation_per_campaign() {
        let recs = run(&[
            RawRecord::campaign("Healthy", Counters::new(10_000, 500, 1500.0, 30.0).with_revenue(6000.0)),
            RawRecord::campaign("Costly", Counters::new(10_000, 50, 6000.0, 5.0)),
        ]);
        assert_eq!(recs.len(), 2);
        let costly = recs.iter().find(|r| r.campaign_name == "Costly").unwrap();
        assert_eq!(costly.source, RecommendationSource::CampaignIssue);
        assert_eq!(costly.priority, Priority::High);
        assert!(costly.detail.contains("reallocating 20-30%"));
    }

    #[test]
    fn test_strong_performer_underfunded() {
        let recs = run(&[RawRecord::campaign(
            "Small",
            Counters::new(5000, 250, 500.0, 20.0).with_revenue(3000.0),
        )]);
        assert_eq!(recs[0].source, RecommendationSource::CampaignPerformance);
        assert_eq!(recs[0].action, "SCALE_BUDGET");
        assert!(recs[0].detail.starts_with("Increase budget allocation"));
    }

    #[test]
    fn test_strong_performer_excellent_roas() {
        let recs = run(&[RawRecord::campaign(
            "Big",
            Counters::new(50_000, 2500, 3000.0, 100.0).with_revenue(9000.0),
        )]);
        assert_eq!(recs[0].source, RecommendationSource::CampaignPerformance);
        assert!(recs[0].detail.starts_with("Excellent ROAS"));
    }
}
