//! Monthly track: campaign-month series across several exports, checked for
//! losses and trends and turned into a strategic plan.

use std::path::Path;

use campaign_analytics::losses::{summarize, LossSummary};
use campaign_analytics::measure::by_campaign_month;
use campaign_analytics::trends::TrendReport;
use campaign_analytics::{LossDetector, LossIssue, TrendAnalyzer};
use campaign_core::config::AnalysisConfig;
use campaign_core::types::{MeasuredRecord, MonthTag, Severity};
use campaign_core::CampaignResult;
use campaign_ingest::normalizer::DatasetSummary;
use campaign_ingest::{ColumnNormalizer, DataQualityReport, MonthlyLoader, NormalizedDataset};
use campaign_reporting::{
    BusinessContext, BusinessContextAnalyzer, ExecutiveSummary, StrategicPlan, StrategicPlanner,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::stage::{require_records, StageFailure, Stages};
use crate::summary::SummaryCounts;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// Records are campaigns; opportunities are growth opportunities.
    #[serde(flatten)]
    pub counts: SummaryCounts,
    pub months: usize,
    pub total_issues: usize,
    pub high_severity_issues: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub generated_at: DateTime<Utc>,
    pub summary: MonthlySummary,
    pub dataset: DatasetSummary,
    pub data_quality: DataQualityReport,
    pub monthly_metrics: Vec<MeasuredRecord>,
    pub losses: Vec<LossIssue>,
    pub loss_summary: LossSummary,
    pub trends: TrendReport,
    pub business_context: BusinessContext,
    pub strategic_plan: StrategicPlan,
    pub executive_summary: ExecutiveSummary,
    pub stage_failures: Vec<StageFailure>,
}

pub struct MonthlyPipeline {
    config: AnalysisConfig,
}

impl MonthlyPipeline {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Analyze every `Mon YYYY.csv` export found in `dir`.
    pub fn run_directory(&self, dir: &Path) -> CampaignResult<MonthlyReport> {
        let loader = MonthlyLoader::new(ColumnNormalizer::new(&self.config.ingest))?;
        self.run(loader.load_directory(dir)?)
    }

    /// Analyze month exports that are already in memory.
    pub fn run_months(&self, months: Vec<(MonthTag, String)>) -> CampaignResult<MonthlyReport> {
        let loader = MonthlyLoader::new(ColumnNormalizer::new(&self.config.ingest))?;
        self.run(loader.load_months(months)?)
    }

    pub fn run(&self, dataset: NormalizedDataset) -> CampaignResult<MonthlyReport> {
        require_records(&dataset)?;
        let cfg = &self.config;
        let mut stages = Stages::new();

        let rows = stages.infallible("metrics", || by_campaign_month(&dataset.records));
        let losses = stages.infallible("loss_detection", || {
            LossDetector::new(&cfg.trends, &cfg.currency).detect(&rows)
        });
        let loss_summary = summarize(&losses);
        let trends = stages.infallible("trend_analysis", || TrendAnalyzer::new(&cfg.trends).analyze(&rows));
        let business_context = stages.infallible("business_context", || {
            BusinessContextAnalyzer::new(&cfg.business).context(&rows)
        });

        let planner = StrategicPlanner::new(&cfg.business, &cfg.currency);
        let strategic_plan =
            stages.infallible("strategic_plan", || planner.plan(&rows, &losses, &business_context));
        let executive_summary = stages.infallible("executive_summary", || {
            planner.executive_summary(&strategic_plan, &losses)
        });

        let mut campaigns: Vec<&str> = rows.iter().map(|r| r.record.campaign_name.as_str()).collect();
        campaigns.sort_unstable();
        campaigns.dedup();
        let mut with_losses: Vec<&str> = losses.iter().map(|l| l.campaign_name.as_str()).collect();
        with_losses.sort_unstable();
        with_losses.dedup();

        let dataset_summary = dataset.summary();
        let summary = MonthlySummary {
            counts: SummaryCounts {
                total_records: campaigns.len(),
                records_with_issues: with_losses.len(),
                opportunities: strategic_plan.growth_opportunities.len(),
                total_recommendations: strategic_plan.summary.total_recommendations,
            },
            months: dataset_summary.months.len(),
            total_issues: losses.len(),
            high_severity_issues: losses.iter().filter(|l| l.severity == Severity::High).count(),
        };
        info!(
            months = summary.months,
            losses = summary.total_issues,
            recommendations = summary.counts.total_recommendations,
            failures = stages.failures().len(),
            "monthly analysis complete"
        );
        metrics::counter!("pipeline.runs", "track" => "monthly").increment(1);

        Ok(MonthlyReport {
            generated_at: Utc::now(),
            summary,
            dataset: dataset_summary,
            data_quality: dataset.quality,
            monthly_metrics: rows,
            losses,
            loss_summary,
            trends,
            business_context,
            strategic_plan,
            executive_summary,
            stage_failures: stages.into_failures(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_analytics::LossDetail;
    use campaign_ingest::monthly::parse_month_label;

    fn month(label: &str, csv: &str) -> (MonthTag, String) {
        (parse_month_label(label).unwrap(), csv.to_string())
    }

    #[test]
    fn test_spend_up_conversions_down() {
        let months = vec![
            month("Feb 2025", "Campaign,Impr.,Clicks,Cost,Conversions\nX,5000,200,1500,10\n"),
            month("Jan 2025", "Campaign,Impr.,Clicks,Cost,Conversions\nX,5000,200,1000,20\n"),
        ];
        let report = MonthlyPipeline::new(&AnalysisConfig::default())
            .run_months(months)
            .unwrap();
        assert_eq!(report.monthly_metrics.len(), 2);
        let loss = report
            .losses
            .iter()
            .find_map(|l| match &l.detail {
                LossDetail::SpendUpConversionsDown {
                    spend_change,
                    conversion_loss,
                    ..
                } => Some((*spend_change, *conversion_loss)),
                _ => None,
            })
            .unwrap();
        assert!((loss.0 - 500.0).abs() < 1e-9);
        assert!((loss.1 - 10.0).abs() < 1e-9);
        assert_eq!(
            report.strategic_plan.loss_remediation.len(),
            report.losses.len()
        );
        assert_eq!(report.executive_summary.total_issues_detected, report.losses.len());
        assert_eq!(report.summary.months, 2);
        assert_eq!(report.summary.counts.total_records, 1);
        assert_eq!(report.summary.counts.records_with_issues, 1);
        assert_eq!(report.summary.total_issues, report.losses.len());
        assert_eq!(
            report.summary.counts.total_recommendations,
            report.strategic_plan.summary.total_recommendations
        );
    }
}
