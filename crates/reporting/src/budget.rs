//! Efficiency-weighted budget allocation across campaigns.

use campaign_core::config::BusinessConfig;
use campaign_core::types::{round2, MeasuredRecord};
use serde::Serialize;

/// Stand-in for a zero ROAS or conversion rate so a campaign without
/// tracked value still receives a share.
const ZERO_SUBSTITUTE: f64 = 0.5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignAllocation {
    pub campaign_name: String,
    pub current_budget: f64,
    pub current_pct: f64,
    pub efficiency_score: f64,
    /// `None` when every efficiency score is zero.
    pub recommended_pct: Option<f64>,
    pub adjustment_pct: Option<f64>,
    pub roas: f64,
    pub conversion_rate: f64,
    pub cpa: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BudgetPlan {
    pub total_budget: f64,
    pub allocations: Vec<CampaignAllocation>,
    pub notes: String,
}

// ---------------------------------------------------------------------------
// BudgetAllocator
// ---------------------------------------------------------------------------

pub struct BudgetAllocator {
    roas_weight: f64,
    conversion_rate_weight: f64,
}

impl BudgetAllocator {
    pub fn new(config: &BusinessConfig) -> Self {
        Self {
            roas_weight: config.roas_weight,
            conversion_rate_weight: config.conversion_rate_weight,
        }
    }

    /// Weighted blend of ROAS and conversion rate.
    pub fn efficiency_score(&self, campaign: &MeasuredRecord) -> f64 {
        let or_substitute = |v: f64| if v > 0.0 { v } else { ZERO_SUBSTITUTE };
        let roas = or_substitute(campaign.metrics.roas);
        let rate = or_substitute(campaign.metrics.conversion_rate);
        self.roas_weight * roas + self.conversion_rate_weight * rate
    }

    /// Current spend split versus the split implied by normalized
    /// efficiency scores.
    pub fn allocate(&self, campaigns: &[MeasuredRecord]) -> BudgetPlan {
        let total: f64 = campaigns.iter().map(|c| c.counters().cost).sum();
        let scores: Vec<f64> = campaigns.iter().map(|c| self.efficiency_score(c)).collect();
        let total_score: f64 = scores.iter().sum();

        let allocations = campaigns
            .iter()
            .zip(scores)
            .map(|(c, score)| {
                let cost = c.counters().cost;
                let current_pct = if total > 0.0 { cost / total * 100.0 } else { 0.0 };
                let recommended = (total_score > 0.0).then(|| score / total_score * 100.0);
                CampaignAllocation {
                    campaign_name: c.record.campaign_name.clone(),
                    current_budget: round2(cost),
                    current_pct: round1(current_pct),
                    efficiency_score: round2(score),
                    recommended_pct: recommended.map(round1),
                    adjustment_pct: recommended.map(|r| round1(r - current_pct)),
                    roas: c.metrics.roas,
                    conversion_rate: c.metrics.conversion_rate,
                    cpa: c.metrics.cpa,
                }
            })
            .collect();

        BudgetPlan {
            total_budget: round2(total),
            allocations,
            notes: "Allocations based on ROAS and conversion rate efficiency".to_string(),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_analytics::measure::by_campaign;
    use campaign_core::types::{Counters, RawRecord};

    fn allocator() -> BudgetAllocator {
        BudgetAllocator::new(&BusinessConfig::default())
    }

    #[test]
    fn test_efficiency_blend() {
        let rows = by_campaign(&[RawRecord::campaign(
            "A",
            Counters::new(1000, 100, 100.0, 5.0).with_revenue(300.0),
        )]);
        // 0.6 * 3.0 + 0.4 * 5.0
        assert!((allocator().efficiency_score(&rows[0]) - 3.8).abs() < 1e-9);
    }

    #[test]
    fn test_zero_values_use_substitute() {
        let rows = by_campaign(&[RawRecord::campaign("A", Counters::new(1000, 0, 0.0, 0.0))]);
        assert!((allocator().efficiency_score(&rows[0]) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_allocation_sums_and_deltas() {
        let rows = by_campaign(&[
            RawRecord::campaign("A", Counters::new(1000, 100, 500.0, 10.0).with_revenue(2000.0)),
            RawRecord::campaign("B", Counters::new(1000, 100, 500.0, 1.0).with_revenue(100.0)),
        ]);
        let plan = allocator().allocate(&rows);
        assert!((plan.total_budget - 1000.0).abs() < 1e-9);
        assert_eq!(plan.allocations.len(), 2);

        let a = &plan.allocations[0];
        let b = &plan.allocations[1];
        assert!((a.current_pct - 50.0).abs() < 1e-9);
        let rec_sum = a.recommended_pct.unwrap() + b.recommended_pct.unwrap();
        assert!((rec_sum - 100.0).abs() < 0.2);
        assert!(a.adjustment_pct.unwrap() > 0.0);
        assert!(b.adjustment_pct.unwrap() < 0.0);
    }

    #[test]
    fn test_zero_weights_leave_recommendation_empty() {
        let config = BusinessConfig {
            roas_weight: 0.0,
            conversion_rate_weight: 0.0,
            ..BusinessConfig::default()
        };
        let rows = by_campaign(&[RawRecord::campaign("A", Counters::new(10, 1, 5.0, 0.0))]);
        let plan = BudgetAllocator::new(&config).allocate(&rows);
        assert!(plan.allocations[0].recommended_pct.is_none());
    }
}
