//! Strategic recommendations for the monthly track and the executive
//! summary built from them.

use campaign_analytics::losses::{LossDetail, LossIssue};
use campaign_analytics::measure::series_by_campaign;
use campaign_core::config::BusinessConfig;
use campaign_core::types::{round2, MeasuredRecord, Priority};
use serde::Serialize;
use tracing::info;

use crate::business::{BusinessContext, FundingStatus, PlatformStatus};

/// Share of a service budget moved by a single increase or decrease.
const BUDGET_SHIFT: f64 = 0.2;
const TOP_CRITICAL: usize = 3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    BudgetIncrease,
    BudgetDecrease,
    PauseInvestigate,
    OptimizeTargeting,
    RefreshCreatives,
    LandingPageAudit,
    PauseOrRestructure,
    ReviewInactive,
    ScaleCampaign,
    RebalancePlatforms,
    ExpandServiceCoverage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategicRecommendation {
    pub kind: StrategyKind,
    pub targets: Vec<String>,
    pub reason: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_cause_hypothesis: Option<String>,
    pub expected_impact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_spend: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_spend: Option<f64>,
    /// Signed budget change for budget moves, amount at stake for losses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Projected monthly revenue gain, where one can be derived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_gain: Option<f64>,
    pub confidence: f64,
    pub priority: Priority,
}

impl StrategicRecommendation {
    fn new(kind: StrategyKind, target: impl Into<String>, priority: Priority, confidence: f64) -> Self {
        Self {
            kind,
            targets: vec![target.into()],
            reason: String::new(),
            action: String::new(),
            root_cause_hypothesis: None,
            expected_impact: String::new(),
            current_spend: None,
            recommended_spend: None,
            amount: None,
            revenue_gain: None,
            confidence,
            priority,
        }
    }

    fn because(mut self, reason: String, action: impl Into<String>, impact: String) -> Self {
        self.reason = reason;
        self.action = action.into();
        self.expected_impact = impact;
        self
    }

    fn hypothesis(mut self, text: &str) -> Self {
        self.root_cause_hypothesis = Some(text.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub total_recommendations: usize,
    pub critical_count: usize,
    pub high_priority_count: usize,
    pub medium_priority_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrategicPlan {
    pub summary: PlanSummary,
    pub budget_recommendations: Vec<StrategicRecommendation>,
    pub loss_remediation: Vec<StrategicRecommendation>,
    pub growth_opportunities: Vec<StrategicRecommendation>,
    pub strategic_initiatives: Vec<StrategicRecommendation>,
}

impl StrategicPlan {
    pub fn all(&self) -> impl Iterator<Item = &StrategicRecommendation> {
        self.budget_recommendations
            .iter()
            .chain(&self.loss_remediation)
            .chain(&self.growth_opportunities)
            .chain(&self.strategic_initiatives)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinancialImpact {
    pub estimated_savings: f64,
    pub estimated_revenue_increase: f64,
    pub net_impact: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    pub total_issues_detected: usize,
    pub critical_actions: usize,
    pub high_priority_actions: usize,
    pub total_recommendations: usize,
    pub top_critical_actions: Vec<StrategicRecommendation>,
    pub estimated_monthly_impact: FinancialImpact,
}

// ---------------------------------------------------------------------------
// StrategicPlanner
// ---------------------------------------------------------------------------

pub struct StrategicPlanner {
    config: BusinessConfig,
    currency: String,
}

impl StrategicPlanner {
    pub fn new(config: &BusinessConfig, currency: impl Into<String>) -> Self {
        Self {
            config: config.clone(),
            currency: currency.into(),
        }
    }

    /// `rows` are campaign-month rows.
    pub fn plan(
        &self,
        rows: &[MeasuredRecord],
        losses: &[LossIssue],
        context: &BusinessContext,
    ) -> StrategicPlan {
        let mut plan = StrategicPlan {
            budget_recommendations: self.budget_recommendations(context),
            loss_remediation: self.loss_remediation(losses),
            growth_opportunities: self.growth_opportunities(rows),
            strategic_initiatives: self.strategic_initiatives(context),
            ..Default::default()
        };
        let count = |p: Priority| plan.all().filter(|r| r.priority == p).count();
        plan.summary = PlanSummary {
            total_recommendations: plan.all().count(),
            critical_count: count(Priority::Critical),
            high_priority_count: count(Priority::High),
            medium_priority_count: count(Priority::Medium),
        };
        info!(
            recommendations = plan.summary.total_recommendations,
            critical = plan.summary.critical_count,
            "strategic plan built"
        );
        plan
    }

    /// Shift budget toward underfunded high-ROI services and away from
    /// overfunded low-ROI ones.
    pub fn budget_recommendations(&self, context: &BusinessContext) -> Vec<StrategicRecommendation> {
        let cfg = &self.config;
        context
            .service_coverage
            .iter()
            .filter_map(|s| {
                let shift = round2(s.total_spend * BUDGET_SHIFT);
                match s.status {
                    FundingStatus::Underfunded if s.roi > cfg.budget_increase_min_roi => {
                        let mut rec =
                            StrategicRecommendation::new(StrategyKind::BudgetIncrease, &s.service, Priority::High, 0.85)
                                .because(
                                    format!("{} has ROI of {:.2}x with underfunded allocation", s.service, s.roi),
                                    format!("Increase {} budget by 20%", s.service),
                                    format!(
                                        "Increase revenue by ~{} {:.0}",
                                        self.currency,
                                        s.roi * shift
                                    ),
                                );
                        rec.current_spend = Some(s.total_spend);
                        rec.recommended_spend = Some(round2(s.total_spend + shift));
                        rec.amount = Some(shift);
                        rec.revenue_gain = Some(round2(s.roi * shift));
                        Some(rec)
                    }
                    FundingStatus::Overfunded if s.roi < cfg.budget_decrease_max_roi => {
                        let mut rec =
                            StrategicRecommendation::new(StrategyKind::BudgetDecrease, &s.service, Priority::Medium, 0.80)
                                .because(
                                    format!("{} returns only {:.2}x on spend", s.service, s.roi),
                                    format!("Decrease {} budget by 20%", s.service),
                                    format!("Save ~{} {:.0} with minimal impact", self.currency, shift),
                                );
                        rec.current_spend = Some(s.total_spend);
                        rec.recommended_spend = Some(round2(s.total_spend - shift));
                        rec.amount = Some(-shift);
                        Some(rec)
                    }
                    _ => None,
                }
            })
            .collect()
    }

    /// One remediation per loss record, in loss order.
    pub fn loss_remediation(&self, losses: &[LossIssue]) -> Vec<StrategicRecommendation> {
        losses.iter().map(|loss| self.remediate(loss)).collect()
    }

    fn remediate(&self, loss: &LossIssue) -> StrategicRecommendation {
        let name = loss.campaign_name.as_str();
        match &loss.detail {
            LossDetail::SpendUpConversionsDown { spend_change, .. } => {
                let mut rec = StrategicRecommendation::new(StrategyKind::PauseInvestigate, name, Priority::High, 0.75)
                    .because(
                        loss.description.clone(),
                        format!("Pause {name} to audit targeting, keywords, and ad copy"),
                        "Reduce wasted spend and restore efficiency".to_string(),
                    )
                    .hypothesis("Audience shift, keyword mismatch, or ad fatigue");
                rec.amount = Some(*spend_change);
                rec
            }
            LossDetail::DecliningEfficiency {
                initial_cpa,
                cpa_increase_pct,
                ..
            } => StrategicRecommendation::new(StrategyKind::OptimizeTargeting, name, Priority::Medium, 0.70)
                .because(
                    format!("CPA increased {cpa_increase_pct:.1}%"),
                    "Review and tighten targeting parameters, test new bid strategies",
                    format!("Restore CPA to ~{} {:.2}", self.currency, initial_cpa),
                )
                .hypothesis("Audience expansion dilution or competitive pressure"),
            LossDetail::CtrSuddenDrop {
                previous_ctr,
                ctr_drop_pct,
                ..
            } => StrategicRecommendation::new(StrategyKind::RefreshCreatives, name, Priority::Medium, 0.80)
                .because(
                    format!("CTR dropped {ctr_drop_pct:.1}%"),
                    "Create new ad variations, test different headlines and copy",
                    format!("Recover CTR toward {previous_ctr:.2}%"),
                )
                .hypothesis("Ad fatigue or seasonal relevance loss"),
            LossDetail::CvrSuddenDrop {
                previous_cvr,
                cvr_drop_pct,
                ..
            } => StrategicRecommendation::new(StrategyKind::LandingPageAudit, name, Priority::High, 0.78)
                .because(
                    format!("CVR dropped {cvr_drop_pct:.1}%"),
                    "Audit landing pages for loading issues, mobile optimization, form problems",
                    format!("Recover CVR toward {previous_cvr:.2}%"),
                )
                .hypothesis("Landing page degradation or UX issues"),
            LossDetail::HighSpendLowRoas { spend, roas, .. } => {
                let at_stake = round2(spend * (1.0 - roas).max(0.0));
                let mut rec =
                    StrategicRecommendation::new(StrategyKind::PauseOrRestructure, name, Priority::Critical, 0.85)
                        .because(
                            format!(
                                "Negative ROI: spending {} {:.2} with {:.2}x ROAS",
                                self.currency, spend, roas
                            ),
                            "Either pause campaign or restructure with tighter targeting and lower bid strategy",
                            format!("Stop losing {} {:.2}/month", self.currency, at_stake),
                        )
                        .hypothesis("Irrelevant traffic or high-intent audience missing");
                rec.amount = Some(at_stake);
                rec
            }
            LossDetail::Inactive { month, spend, .. } => {
                let mut rec = StrategicRecommendation::new(StrategyKind::ReviewInactive, name, Priority::Medium, 0.70)
                    .because(
                        format!("No conversions in {month}"),
                        "Check campaign status, budget caps and conversion tracking, or remove the campaign",
                        "Free budget tied up in inactive campaigns".to_string(),
                    )
                    .hypothesis("Paused delivery, exhausted budget or broken tracking");
                rec.amount = Some(*spend);
                rec
            }
        }
    }

    /// Campaigns whose mean monthly ROAS exceeds the growth threshold.
    pub fn growth_opportunities(&self, rows: &[MeasuredRecord]) -> Vec<StrategicRecommendation> {
        let cfg = &self.config;
        series_by_campaign(rows)
            .into_iter()
            .filter_map(|(name, series)| {
                let months = series.len() as f64;
                let mean_roas = series.iter().map(|r| r.metrics.roas).sum::<f64>() / months;
                if mean_roas <= cfg.growth_roas {
                    return None;
                }
                let spend: f64 = series.iter().map(|r| r.counters().cost).sum();
                let conversions: f64 = series.iter().map(|r| r.counters().conversions).sum();
                let monthly_spend = spend / months;
                let increase = monthly_spend * (cfg.growth_budget_multiplier - 1.0);
                let extra_conversions = conversions / months * (cfg.growth_budget_multiplier - 1.0);
                let mut rec = StrategicRecommendation::new(StrategyKind::ScaleCampaign, name, Priority::High, 0.90)
                    .because(
                        format!("{name} has strong ROAS of {mean_roas:.2}x"),
                        format!(
                            "Increase daily budget by {:.0}% and test new keywords/audiences",
                            (cfg.growth_budget_multiplier - 1.0) * 100.0
                        ),
                        format!("Generate ~{extra_conversions:.0} additional monthly conversions"),
                    );
                rec.current_spend = Some(round2(monthly_spend));
                rec.recommended_spend = Some(round2(monthly_spend + increase));
                rec.amount = Some(round2(increase));
                rec.revenue_gain = Some(round2(increase * mean_roas));
                Some(rec)
            })
            .collect()
    }

    pub fn strategic_initiatives(&self, context: &BusinessContext) -> Vec<StrategicRecommendation> {
        let mut out = Vec::new();

        let misaligned: Vec<String> = context
            .platform_alignment
            .iter()
            .filter(|p| p.status == PlatformStatus::Misaligned)
            .map(|p| p.platform.clone())
            .collect();
        if !misaligned.is_empty() {
            let mut rec = StrategicRecommendation::new(StrategyKind::RebalancePlatforms, "", Priority::Medium, 0.75)
                .because(
                    "Platform budget allocation doesn't match strategic targets".to_string(),
                    "Gradually shift budget toward underrepresented platforms (5% per month)",
                    "Better platform diversification and risk reduction".to_string(),
                );
            rec.targets = misaligned;
            out.push(rec);
        }

        if !context.service_gaps.is_empty() {
            let mut rec = StrategicRecommendation::new(StrategyKind::ExpandServiceCoverage, "", Priority::Medium, 0.70)
                .because(
                    format!(
                        "{} services are underrepresented or missing",
                        context.service_gaps.len()
                    ),
                    "Launch new campaign clusters for unrepresented services",
                    "Capture untapped demand and increase overall revenue".to_string(),
                );
            rec.targets = context.service_gaps.iter().map(|g| g.service.clone()).collect();
            out.push(rec);
        }

        out
    }

    pub fn executive_summary(&self, plan: &StrategicPlan, losses: &[LossIssue]) -> ExecutiveSummary {
        let critical: Vec<&StrategicRecommendation> = plan
            .loss_remediation
            .iter()
            .filter(|r| r.priority == Priority::Critical)
            .collect();
        let high_priority_actions = plan
            .budget_recommendations
            .iter()
            .chain(&plan.loss_remediation)
            .chain(&plan.growth_opportunities)
            .filter(|r| r.priority == Priority::High)
            .count();
        ExecutiveSummary {
            total_issues_detected: losses.len(),
            critical_actions: critical.len(),
            high_priority_actions,
            total_recommendations: plan.summary.total_recommendations,
            top_critical_actions: critical.into_iter().take(TOP_CRITICAL).cloned().collect(),
            estimated_monthly_impact: financial_impact(plan),
        }
    }
}

/// Savings come from budget decreases and high-spend/low-ROAS losses;
/// revenue from budget increases and campaign scaling.
pub fn financial_impact(plan: &StrategicPlan) -> FinancialImpact {
    let savings: f64 = plan
        .budget_recommendations
        .iter()
        .filter(|r| r.kind == StrategyKind::BudgetDecrease)
        .filter_map(|r| r.amount.map(f64::abs))
        .chain(
            plan.loss_remediation
                .iter()
                .filter(|r| r.kind == StrategyKind::PauseOrRestructure)
                .filter_map(|r| r.amount),
        )
        .sum();
    let revenue: f64 = plan.all().filter_map(|r| r.revenue_gain).sum();
    FinancialImpact {
        estimated_savings: round2(savings),
        estimated_revenue_increase: round2(revenue),
        net_impact: round2(savings + revenue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::{PlatformAlignment, ServiceCoverage, ServiceFundingGap};
    use campaign_analytics::measure::by_campaign_month;
    use campaign_core::types::{Counters, RawRecord, Severity};

    fn planner() -> StrategicPlanner {
        StrategicPlanner::new(&BusinessConfig::default(), "AED")
    }

    fn coverage(service: &str, spend: f64, roi: f64, status: FundingStatus) -> ServiceCoverage {
        ServiceCoverage {
            service: service.to_string(),
            total_spend: spend,
            spend_pct: 0.0,
            expected_importance_pct: 0.0,
            conversions: 0.0,
            revenue: spend * roi,
            roi,
            alignment: 0.5,
            status,
        }
    }

    fn loss(detail: LossDetail) -> LossIssue {
        LossIssue {
            campaign_name: "X".to_string(),
            campaign_type: None,
            severity: Severity::High,
            description: "spend up".to_string(),
            detail,
        }
    }

    #[test]
    fn test_budget_shifts() {
        let ctx = BusinessContext {
            service_coverage: vec![
                coverage("home_cleaning", 1000.0, 3.0, FundingStatus::Underfunded),
                coverage("office_cleaning", 2000.0, 0.5, FundingStatus::Overfunded),
                coverage("carpet_cleaning", 500.0, 1.2, FundingStatus::Underfunded),
            ],
            ..Default::default()
        };
        let recs = planner().budget_recommendations(&ctx);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].kind, StrategyKind::BudgetIncrease);
        assert_eq!(recs[0].recommended_spend, Some(1200.0));
        assert_eq!(recs[1].kind, StrategyKind::BudgetDecrease);
        assert_eq!(recs[1].amount, Some(-400.0));
    }

    #[test]
    fn test_one_remediation_per_loss() {
        let losses = [
            loss(LossDetail::HighSpendLowRoas {
                month: "Apr 2025".to_string(),
                spend: 1000.0,
                conversions: 1.0,
                revenue: 400.0,
                roas: 0.4,
            }),
            loss(LossDetail::Inactive {
                month: "Apr 2025".to_string(),
                impressions: 10,
                clicks: 0,
                conversions: 0.0,
                spend: 10.0,
            }),
        ];
        let recs = planner().loss_remediation(&losses);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].priority, Priority::Critical);
        assert_eq!(recs[0].amount, Some(600.0));
        assert_eq!(recs[1].kind, StrategyKind::ReviewInactive);
    }

    #[test]
    fn test_growth_for_high_roas_campaigns() {
        let rows = by_campaign_month(&[
            RawRecord::campaign("Star", Counters::new(1000, 100, 100.0, 10.0).with_revenue(400.0))
                .in_month("Mar 2025", 24302),
            RawRecord::campaign("Star", Counters::new(1000, 100, 300.0, 20.0).with_revenue(900.0))
                .in_month("Apr 2025", 24303),
            RawRecord::campaign("Dud", Counters::new(1000, 100, 100.0, 1.0).with_revenue(50.0))
                .in_month("Mar 2025", 24302),
        ]);
        let recs = planner().growth_opportunities(&rows);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].targets, vec!["Star".to_string()]);
        assert_eq!(recs[0].current_spend, Some(200.0));
        assert_eq!(recs[0].recommended_spend, Some(260.0));
    }

    #[test]
    fn test_initiatives_and_summary() {
        let ctx = BusinessContext {
            platform_alignment: vec![PlatformAlignment {
                platform: "iOS App".to_string(),
                actual_spend: 0.0,
                actual_pct: 0.0,
                target_pct: 15.0,
                variance_pct: -15.0,
                status: PlatformStatus::Misaligned,
            }],
            service_gaps: vec![ServiceFundingGap {
                service: "window_cleaning".to_string(),
                status: FundingStatus::Unrepresented,
                importance_pct: 8.0,
                current_spend: None,
                expected_spend: None,
                gap: None,
                recommendation: String::new(),
            }],
            ..Default::default()
        };
        let losses = [loss(LossDetail::HighSpendLowRoas {
            month: "Apr 2025".to_string(),
            spend: 500.0,
            conversions: 0.0,
            revenue: 0.0,
            roas: 0.0,
        })];
        let p = planner();
        let plan = p.plan(&[], &losses, &ctx);
        assert_eq!(plan.strategic_initiatives.len(), 2);
        assert_eq!(plan.summary.total_recommendations, 3);
        assert_eq!(plan.summary.critical_count, 1);

        let summary = p.executive_summary(&plan, &losses);
        assert_eq!(summary.critical_actions, 1);
        assert_eq!(summary.top_critical_actions.len(), 1);
        assert!((summary.estimated_monthly_impact.estimated_savings - 500.0).abs() < 1e-9);
    }
}
