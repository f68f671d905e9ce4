//! Campaign track: one export row per campaign (or per campaign and day),
//! aggregated to campaign level and audited.

use campaign_analytics::comparison::{self, CampaignComparison, SegmentDimension, SegmentPerformance};
use campaign_analytics::measure::by_campaign;
use campaign_analytics::rules::{subjects_with_issues, IssueDetector, RuleTable};
use campaign_core::config::AnalysisConfig;
use campaign_core::types::{round2, Counters, Issue, MeasuredRecord, Recommendation, Severity};
use campaign_core::CampaignResult;
use campaign_ingest::normalizer::DatasetSummary;
use campaign_ingest::{ColumnNormalizer, DataQualityReport, NormalizedDataset, ReportKind};
use campaign_reporting::{BudgetAllocator, BudgetPlan, CampaignAdvisor};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::stage::{require_records, StageFailure, Stages};
use crate::summary::SummaryCounts;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignSummary {
    /// Opportunities are campaigns the allocator would give more budget.
    #[serde(flatten)]
    pub counts: SummaryCounts,
    pub total_issues: usize,
    pub high_severity_issues: usize,
    pub total_spend: f64,
    pub total_conversions: f64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignReport {
    pub generated_at: DateTime<Utc>,
    pub summary: CampaignSummary,
    pub dataset: DatasetSummary,
    pub data_quality: DataQualityReport,
    pub campaign_metrics: Vec<MeasuredRecord>,
    pub issues: Vec<Issue>,
    pub comparison: CampaignComparison,
    pub platform_breakdown: Vec<SegmentPerformance>,
    pub device_breakdown: Vec<SegmentPerformance>,
    pub recommendations: Vec<Recommendation>,
    pub budget_allocation: BudgetPlan,
    pub stage_failures: Vec<StageFailure>,
}

pub struct CampaignPipeline {
    config: AnalysisConfig,
}

impl CampaignPipeline {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Normalize a campaign export and analyze it. Structural input errors
    /// are returned; analyzer failures are recorded in the report.
    pub fn run_csv(&self, text: &str) -> CampaignResult<CampaignReport> {
        let dataset =
            ColumnNormalizer::new(&self.config.ingest).normalize_text(text, ReportKind::Campaign)?;
        self.run(dataset)
    }

    pub fn run(&self, dataset: NormalizedDataset) -> CampaignResult<CampaignReport> {
        require_records(&dataset)?;
        let cfg = &self.config;
        let mut stages = Stages::new();

        let campaigns = stages.infallible("metrics", || by_campaign(&dataset.records));
        let issues = stages.infallible("issue_detection", || {
            IssueDetector::new(RuleTable::campaign(&cfg.campaign_rules), &cfg.currency).detect(&campaigns)
        });
        let comparison = stages.infallible("comparison", || comparison::compare(&campaigns));
        let platform_breakdown = stages.infallible("platform_breakdown", || {
            comparison::breakdown(&dataset.records, SegmentDimension::Platform)
        });
        let device_breakdown = stages.infallible("device_breakdown", || {
            comparison::breakdown(&dataset.records, SegmentDimension::DeviceOs)
        });
        let recommendations = stages.infallible("campaign_advice", || {
            CampaignAdvisor::new(&cfg.currency).advise(&campaigns, &issues)
        });
        let budget_allocation = stages.infallible("budget_allocation", || {
            BudgetAllocator::new(&cfg.business).allocate(&campaigns)
        });

        let totals = Counters::total(campaigns.iter().map(|c| c.counters()));
        let summary = CampaignSummary {
            counts: SummaryCounts {
                total_records: campaigns.len(),
                records_with_issues: subjects_with_issues(&issues),
                opportunities: budget_allocation
                    .allocations
                    .iter()
                    .filter(|a| a.adjustment_pct.is_some_and(|adj| adj > 0.0))
                    .count(),
                total_recommendations: recommendations.len(),
            },
            total_issues: issues.len(),
            high_severity_issues: issues.iter().filter(|i| i.severity == Severity::High).count(),
            total_spend: round2(totals.cost),
            total_conversions: round2(totals.conversions),
            total_revenue: round2(totals.revenue_or_zero()),
        };
        info!(
            campaigns = summary.counts.total_records,
            issues = summary.total_issues,
            failures = stages.failures().len(),
            "campaign analysis complete"
        );
        metrics::counter!("pipeline.runs", "track" => "campaign").increment(1);

        Ok(CampaignReport {
            generated_at: Utc::now(),
            summary,
            dataset: dataset.summary(),
            data_quality: dataset.quality,
            campaign_metrics: campaigns,
            issues,
            comparison,
            platform_breakdown,
            device_breakdown,
            recommendations,
            budget_allocation,
            stage_failures: stages.into_failures(),
        })
    }
}
