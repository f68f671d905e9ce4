//! Keyword track: per-keyword audit, match-type and demand analysis, market
//! and relevance checks, then one synthesized recommendation list.

use campaign_analytics::measure::measure_rows;
use campaign_analytics::rules::{subjects_with_issues, IssueDetector, RuleTable};
use campaign_core::config::AnalysisConfig;
use campaign_core::types::{Issue, MeasuredRecord, Recommendation};
use campaign_core::CampaignResult;
use campaign_ingest::normalizer::DatasetSummary;
use campaign_ingest::{ColumnNormalizer, DataQualityReport, NormalizedDataset, ReportKind};
use campaign_keywords::match_type::{BestKeyword, MatchTypePerformance};
use campaign_keywords::{
    LostDemandDetector, LostDemandReport, MarketInsights, MarketReport, MatchTypeOptimizer,
    MatchTypeRecommendation, RelevanceChecker, RelevanceReport,
};
use campaign_reporting::{RecommendationSummary, RecommendationSynthesizer};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::stage::{require_records, StageFailure, Stages};
use crate::summary::SummaryCounts;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeywordSummary {
    /// Opportunities span match-type changes, actionable lost demand and
    /// new keywords.
    #[serde(flatten)]
    pub counts: SummaryCounts,
    pub total_issues: usize,
    pub match_type_opportunities: usize,
    pub lost_demand_items: usize,
    pub new_keyword_opportunities: usize,
    pub misaligned_keywords: usize,
    pub recommendations: RecommendationSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordReport {
    pub generated_at: DateTime<Utc>,
    pub summary: KeywordSummary,
    pub dataset: DatasetSummary,
    pub data_quality: DataQualityReport,
    pub keyword_metrics: Vec<MeasuredRecord>,
    pub issues: Vec<Issue>,
    pub match_type_performance: Vec<MatchTypePerformance>,
    pub match_type_recommendations: Vec<MatchTypeRecommendation>,
    pub best_keywords: Vec<BestKeyword>,
    pub lost_demand: LostDemandReport,
    pub market: MarketReport,
    pub relevance: RelevanceReport,
    pub recommendations: Vec<Recommendation>,
    pub stage_failures: Vec<StageFailure>,
}

pub struct KeywordPipeline {
    config: AnalysisConfig,
}

impl KeywordPipeline {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn run_csv(&self, text: &str) -> CampaignResult<KeywordReport> {
        let dataset =
            ColumnNormalizer::new(&self.config.ingest).normalize_text(text, ReportKind::Keyword)?;
        self.run(dataset)
    }

    pub fn run(&self, dataset: NormalizedDataset) -> CampaignResult<KeywordReport> {
        require_records(&dataset)?;
        let cfg = &self.config;
        let mut stages = Stages::new();

        let rows = stages.infallible("metrics", || measure_rows(&dataset.records));
        let issues = stages.infallible("issue_detection", || {
            IssueDetector::new(RuleTable::keyword(&cfg.keyword_rules), &cfg.currency).detect(&rows)
        });

        let optimizer = MatchTypeOptimizer::new(&cfg.match_types);
        let match_type_performance =
            stages.infallible("match_type_performance", || optimizer.performance(&rows));
        let match_type_recommendations =
            stages.infallible("match_type_optimization", || optimizer.recommend(&rows));
        let best_keywords = stages.infallible("best_keywords", || optimizer.best_keywords(&rows));

        let lost_demand = stages.infallible("lost_demand", || {
            LostDemandDetector::new(&cfg.lost_demand).detect(&rows)
        });
        let market = stages.run("market_insights", || {
            Ok(MarketInsights::new(&cfg.market)?.analyze(&rows))
        });
        let relevance = stages.infallible("website_relevance", || {
            RelevanceChecker::new(&cfg.relevance, &cfg.currency).report(&rows)
        });

        let recommendations = stages.infallible("recommendation_synthesis", || {
            RecommendationSynthesizer::new(cfg.assumptions, &cfg.currency).synthesize(
                &issues,
                &match_type_recommendations,
                lost_demand.actionable(),
                &market.new_keywords,
            )
        });

        let summary = KeywordSummary {
            counts: SummaryCounts {
                total_records: rows.len(),
                records_with_issues: subjects_with_issues(&issues),
                opportunities: match_type_recommendations.len()
                    + lost_demand.actionable().count()
                    + market.new_keywords.len(),
                total_recommendations: recommendations.len(),
            },
            total_issues: issues.len(),
            match_type_opportunities: match_type_recommendations.len(),
            lost_demand_items: lost_demand.total(),
            new_keyword_opportunities: market.new_keywords.len(),
            misaligned_keywords: relevance.misaligned_keywords,
            recommendations: RecommendationSummary::of(&recommendations),
        };
        info!(
            keywords = summary.counts.total_records,
            issues = summary.total_issues,
            recommendations = recommendations.len(),
            failures = stages.failures().len(),
            "keyword analysis complete"
        );
        metrics::counter!("pipeline.runs", "track" => "keyword").increment(1);

        Ok(KeywordReport {
            generated_at: Utc::now(),
            summary,
            dataset: dataset.summary(),
            data_quality: dataset.quality,
            keyword_metrics: rows,
            issues,
            match_type_performance,
            match_type_recommendations,
            best_keywords,
            lost_demand,
            market,
            relevance,
            recommendations,
            stage_failures: stages.into_failures(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
Keyword,Match type,Campaign,Impr.,Clicks,Cost,Conversions
home cleaning,Broad match,Cleaning Search,2000,100,250,8
sofa cleaning,Exact match,Cleaning Search,1000,0,0,0
maid service,Phrase match,Cleaning Search,200,1,5,0
";

    #[test]
    fn test_keyword_run() {
        let report = KeywordPipeline::new(&AnalysisConfig::default())
            .run_csv(EXPORT)
            .unwrap();
        assert_eq!(report.summary.counts.total_records, 3);
        assert_eq!(
            report.summary.counts.opportunities,
            report.summary.counts.total_recommendations - report.issues.len()
        );
        assert!(report.stage_failures.is_empty());
        assert!(report
            .issues
            .iter()
            .any(|i| i.subject == "sofa cleaning" && i.issue_type.as_str() == "NO_CLICKS"));
        assert!(report
            .match_type_recommendations
            .iter()
            .any(|m| m.keyword == "home cleaning"));
        assert_eq!(
            report.summary.recommendations.total_recommendations,
            report.recommendations.len()
        );
        assert!(!report.market.new_keywords.is_empty());
    }

    #[test]
    fn test_recommendations_are_deterministic() {
        let pipeline = KeywordPipeline::new(&AnalysisConfig::default());
        let first = serde_json::to_string(&pipeline.run_csv(EXPORT).unwrap().recommendations).unwrap();
        let second = serde_json::to_string(&pipeline.run_csv(EXPORT).unwrap().recommendations).unwrap();
        assert_eq!(first, second);
    }
}
