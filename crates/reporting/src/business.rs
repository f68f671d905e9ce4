//! Business context: how spend lines up with the services the advertiser
//! sells and with the platform budget targets.

use campaign_core::config::{BusinessConfig, BusinessService, SplitPolicyKind};
use campaign_core::types::{round2, Counters, MeasuredRecord};
use serde::Serialize;
use tracing::debug;

const TOP_SERVICES: usize = 3;

// ---------------------------------------------------------------------------
// Split policy
// ---------------------------------------------------------------------------

/// Decides how a campaign matching several services is attributed.
/// Returns `(service index, share)` pairs whose shares sum to one.
pub trait SplitPolicy: Send + Sync {
    fn split(&self, matched: &[usize]) -> Vec<(usize, f64)>;
}

pub struct EvenSplit;

impl SplitPolicy for EvenSplit {
    fn split(&self, matched: &[usize]) -> Vec<(usize, f64)> {
        let share = 1.0 / matched.len().max(1) as f64;
        matched.iter().map(|&i| (i, share)).collect()
    }
}

pub struct FirstMatch;

impl SplitPolicy for FirstMatch {
    fn split(&self, matched: &[usize]) -> Vec<(usize, f64)> {
        matched.first().map(|&i| vec![(i, 1.0)]).unwrap_or_default()
    }
}

fn policy_for(kind: SplitPolicyKind) -> Box<dyn SplitPolicy> {
    match kind {
        SplitPolicyKind::Even => Box::new(EvenSplit),
        SplitPolicyKind::FirstMatch => Box::new(FirstMatch),
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FundingStatus {
    Unrepresented,
    Balanced,
    Underfunded,
    Overfunded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCoverage {
    pub service: String,
    pub total_spend: f64,
    pub spend_pct: f64,
    pub expected_importance_pct: f64,
    pub conversions: f64,
    pub revenue: f64,
    pub roi: f64,
    pub alignment: f64,
    pub status: FundingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlatformStatus {
    Aligned,
    Misaligned,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformAlignment {
    pub platform: String,
    pub actual_spend: f64,
    pub actual_pct: f64,
    pub target_pct: f64,
    pub variance_pct: f64,
    pub status: PlatformStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopService {
    pub service: String,
    pub roi: f64,
    pub conversions: f64,
    pub spend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceFundingGap {
    pub service: String,
    pub status: FundingStatus,
    pub importance_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_spend: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_spend: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusinessContext {
    pub service_coverage: Vec<ServiceCoverage>,
    pub platform_alignment: Vec<PlatformAlignment>,
    pub top_services: Vec<TopService>,
    pub service_gaps: Vec<ServiceFundingGap>,
    /// Spend of campaigns whose names match no configured service.
    pub unmapped_spend: f64,
}

// ---------------------------------------------------------------------------
// Alignment bands
// ---------------------------------------------------------------------------

/// Score in `[0, 1]` for how close actual spend share sits to the expected
/// importance weight.
pub fn alignment_score(actual: f64, expected: f64) -> f64 {
    if expected == 0.0 {
        return if actual > 0.0 { 0.0 } else { 1.0 };
    }
    let ratio = actual / expected;
    if (0.8..=1.2).contains(&ratio) {
        1.0
    } else if (0.5..=1.5).contains(&ratio) {
        0.8
    } else if (0.3..=2.0).contains(&ratio) {
        0.5
    } else {
        0.2
    }
}

pub fn funding_status(actual: f64, expected: f64) -> FundingStatus {
    if actual == 0.0 {
        return FundingStatus::Unrepresented;
    }
    let ratio = if expected > 0.0 { actual / expected } else { 2.0 };
    if (0.8..=1.2).contains(&ratio) {
        FundingStatus::Balanced
    } else if ratio < 0.8 {
        FundingStatus::Underfunded
    } else {
        FundingStatus::Overfunded
    }
}

// ---------------------------------------------------------------------------
// BusinessContextAnalyzer
// ---------------------------------------------------------------------------

pub struct BusinessContextAnalyzer {
    config: BusinessConfig,
    policy: Box<dyn SplitPolicy>,
}

impl BusinessContextAnalyzer {
    pub fn new(config: &BusinessConfig) -> Self {
        Self {
            policy: policy_for(config.split_policy),
            config: config.clone(),
        }
    }

    pub fn with_policy(config: &BusinessConfig, policy: Box<dyn SplitPolicy>) -> Self {
        Self {
            config: config.clone(),
            policy,
        }
    }

    pub fn context(&self, rows: &[MeasuredRecord]) -> BusinessContext {
        let (service_coverage, unmapped) = self.service_coverage(rows);
        let total: f64 = rows.iter().map(|r| r.counters().cost).sum();
        let ctx = BusinessContext {
            platform_alignment: self.platform_alignment(rows),
            top_services: top_services(&service_coverage),
            service_gaps: self.service_gaps(&service_coverage, total),
            service_coverage,
            unmapped_spend: round2(unmapped),
        };
        debug!(
            services = ctx.service_coverage.len(),
            gaps = ctx.service_gaps.len(),
            "business context built"
        );
        ctx
    }

    /// Indices of the services whose terms appear in the campaign name.
    pub fn services_for(&self, campaign_name: &str) -> Vec<usize> {
        let lowered = campaign_name.to_lowercase();
        self.config
            .services
            .iter()
            .enumerate()
            .filter(|(_, s)| matches_service(s, &lowered))
            .map(|(i, _)| i)
            .collect()
    }

    /// Per-service totals in configured order, plus the unmapped spend.
    pub fn service_coverage(&self, rows: &[MeasuredRecord]) -> (Vec<ServiceCoverage>, f64) {
        let services = &self.config.services;
        let mut totals = vec![Counters::default(); services.len()];
        let mut unmapped = 0.0;

        for row in rows {
            let matched = self.services_for(&row.record.campaign_name);
            if matched.is_empty() {
                unmapped += row.counters().cost;
                continue;
            }
            for (i, share) in self.policy.split(&matched) {
                let c = row.counters();
                let t = &mut totals[i];
                t.cost += c.cost * share;
                t.conversions += c.conversions * share;
                t.revenue = Some(t.revenue_or_zero() + c.revenue_or_zero() * share);
            }
        }

        let total_budget: f64 = rows.iter().map(|r| r.counters().cost).sum();
        let coverage = services
            .iter()
            .zip(totals)
            .map(|(service, t)| {
                let actual = if total_budget > 0.0 { t.cost / total_budget } else { 0.0 };
                let expected = service.expected_importance;
                let revenue = t.revenue_or_zero();
                ServiceCoverage {
                    service: service.name.clone(),
                    total_spend: round2(t.cost),
                    spend_pct: round2(actual * 100.0),
                    expected_importance_pct: round2(expected * 100.0),
                    conversions: round2(t.conversions),
                    revenue: round2(revenue),
                    roi: if t.cost > 0.0 { round2(revenue / t.cost) } else { 0.0 },
                    alignment: alignment_score(actual, expected),
                    status: funding_status(actual, expected),
                }
            })
            .collect();
        (coverage, unmapped)
    }

    /// Spend share per campaign type against the configured targets.
    pub fn platform_alignment(&self, rows: &[MeasuredRecord]) -> Vec<PlatformAlignment> {
        let total: f64 = rows.iter().map(|r| r.counters().cost).sum();
        self.config
            .platform_targets
            .iter()
            .map(|target| {
                let spend: f64 = rows
                    .iter()
                    .filter(|r| r.record.campaign_type.as_deref() == Some(target.campaign_type.as_str()))
                    .map(|r| r.counters().cost)
                    .sum();
                let actual_pct = if total > 0.0 { spend / total * 100.0 } else { 0.0 };
                let target_pct = target.target_share * 100.0;
                let variance = actual_pct - target_pct;
                PlatformAlignment {
                    platform: target.campaign_type.clone(),
                    actual_spend: round2(spend),
                    actual_pct: round2(actual_pct),
                    target_pct: round2(target_pct),
                    variance_pct: round2(variance),
                    status: if variance.abs() < self.config.platform_tolerance_pct {
                        PlatformStatus::Aligned
                    } else {
                        PlatformStatus::Misaligned
                    },
                }
            })
            .collect()
    }

    pub fn service_gaps(&self, coverage: &[ServiceCoverage], total_budget: f64) -> Vec<ServiceFundingGap> {
        coverage
            .iter()
            .filter_map(|c| match c.status {
                FundingStatus::Unrepresented => Some(ServiceFundingGap {
                    service: c.service.clone(),
                    status: c.status,
                    importance_pct: c.expected_importance_pct,
                    current_spend: None,
                    expected_spend: None,
                    gap: None,
                    recommendation: format!(
                        "No campaigns found for {}. Consider creating targeted campaigns.",
                        c.service
                    ),
                }),
                FundingStatus::Underfunded => {
                    let expected = c.expected_importance_pct / 100.0 * total_budget;
                    Some(ServiceFundingGap {
                        service: c.service.clone(),
                        status: c.status,
                        importance_pct: c.expected_importance_pct,
                        current_spend: Some(c.total_spend),
                        expected_spend: Some(round2(expected)),
                        gap: Some(round2(expected - c.total_spend)),
                        recommendation: format!(
                            "Increase budget for {} (currently {}% vs expected {}%)",
                            c.service, c.spend_pct, c.expected_importance_pct
                        ),
                    })
                }
                FundingStatus::Balanced | FundingStatus::Overfunded => None,
            })
            .collect()
    }
}

fn matches_service(service: &BusinessService, lowered_name: &str) -> bool {
    service
        .terms
        .iter()
        .any(|t| lowered_name.contains(&t.to_lowercase()))
}

/// Funded services ranked by ROI, highest first. Ties keep configured order.
pub fn top_services(coverage: &[ServiceCoverage]) -> Vec<TopService> {
    let mut ranked: Vec<TopService> = coverage
        .iter()
        .filter(|c| c.total_spend > 0.0)
        .map(|c| TopService {
            service: c.service.clone(),
            roi: c.roi,
            conversions: c.conversions,
            spend: c.total_spend,
        })
        .collect();
    ranked.sort_by(|a, b| b.roi.total_cmp(&a.roi));
    ranked.truncate(TOP_SERVICES);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_analytics::measure::measure;
    use campaign_core::types::RawRecord;

    fn row(name: &str, campaign_type: &str, cost: f64, conversions: f64, revenue: f64) -> MeasuredRecord {
        let mut r = RawRecord::campaign(
            name,
            Counters::new(1000, 100, cost, conversions).with_revenue(revenue),
        );
        r.campaign_type = Some(campaign_type.to_string());
        measure(r)
    }

    #[test]
    fn test_alignment_bands() {
        assert!((alignment_score(0.35, 0.35) - 1.0).abs() < f64::EPSILON);
        assert!((alignment_score(0.25, 0.35) - 0.8).abs() < f64::EPSILON);
        assert!((alignment_score(0.15, 0.35) - 0.5).abs() < f64::EPSILON);
        assert!((alignment_score(0.9, 0.35) - 0.2).abs() < f64::EPSILON);
        assert!((alignment_score(0.0, 0.0) - 1.0).abs() < f64::EPSILON);
        assert_eq!(funding_status(0.0, 0.3), FundingStatus::Unrepresented);
        assert_eq!(funding_status(0.1, 0.3), FundingStatus::Underfunded);
        assert_eq!(funding_status(0.6, 0.3), FundingStatus::Overfunded);
    }

    #[test]
    fn test_even_split_across_matched_services() {
        let analyzer = BusinessContextAnalyzer::new(&BusinessConfig::default());
        let rows = [row("Home Office Deals", "Search", 1000.0, 10.0, 3000.0)];
        let (coverage, unmapped) = analyzer.service_coverage(&rows);
        assert!(unmapped.abs() < f64::EPSILON);
        assert!((coverage[0].total_spend - 500.0).abs() < 1e-9);
        assert!((coverage[1].total_spend - 500.0).abs() < 1e-9);
        assert!((coverage[0].conversions - 5.0).abs() < 1e-9);
        assert!((coverage[0].roi - 3.0).abs() < 1e-9);
        assert_eq!(coverage[2].status, FundingStatus::Unrepresented);
    }

    #[test]
    fn test_first_match_policy() {
        let config = BusinessConfig {
            split_policy: SplitPolicyKind::FirstMatch,
            ..BusinessConfig::default()
        };
        let analyzer = BusinessContextAnalyzer::new(&config);
        let (coverage, _) = analyzer.service_coverage(&[row("Home Office", "Search", 1000.0, 10.0, 0.0)]);
        assert!((coverage[0].total_spend - 1000.0).abs() < 1e-9);
        assert!(coverage[1].total_spend.abs() < f64::EPSILON);
    }

    #[test]
    fn test_platform_alignment_and_gaps() {
        let analyzer = BusinessContextAnalyzer::new(&BusinessConfig::default());
        let rows = [
            row("Villa Cleaning", "Search", 400.0, 10.0, 2000.0),
            row("Brand", "Performance Max", 600.0, 5.0, 500.0),
        ];
        let ctx = analyzer.context(&rows);
        assert_eq!(ctx.platform_alignment[0].platform, "Search");
        assert_eq!(ctx.platform_alignment[0].status, PlatformStatus::Aligned);
        assert_eq!(ctx.platform_alignment[1].status, PlatformStatus::Misaligned);
        assert!((ctx.unmapped_spend - 600.0).abs() < 1e-9);
        assert_eq!(ctx.top_services.len(), 1);
        assert_eq!(ctx.top_services[0].service, "home_cleaning");
        assert!(ctx
            .service_gaps
            .iter()
            .all(|g| g.status == FundingStatus::Unrepresented));
        assert_eq!(ctx.service_gaps.len(), 5);
    }
}
