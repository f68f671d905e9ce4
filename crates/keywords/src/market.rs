//! Market insights: theme volume and efficiency, new keyword candidates,
//! location coverage and core-service gaps.

use campaign_analytics::measure::derive;
use campaign_core::config::MarketConfig;
use campaign_core::types::{round2, Counters, MatchType, MeasuredRecord, Priority, Severity};
use campaign_core::{CampaignError, CampaignResult};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

const HIGH_OPPORTUNITY_IMPRESSIONS: u64 = 500;
const HIGH_OPPORTUNITY_CONVERSION_RATE: f64 = 2.0;
const MEDIUM_OPPORTUNITY_IMPRESSIONS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeStrength {
    Strong,
    Moderate,
    Weak,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeInsight {
    pub theme: String,
    pub keyword_count: usize,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub ctr: f64,
    pub total_conversions: f64,
    pub conversion_rate: f64,
    pub trend_strength: ThemeStrength,
    pub opportunity_level: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordOpportunity {
    pub suggested_keyword: String,
    pub intent: String,
    pub recommended_match_type: MatchType,
    pub estimated_monthly_searches: u64,
    pub priority: Priority,
    pub reason: String,
    pub action: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationStatus {
    Active,
    #[default]
    GapIdentified,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationOpportunity {
    pub status: LocationStatus,
    pub keyword_count: usize,
    pub total_impressions: u64,
    pub total_conversions: f64,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggested_keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceGapKind {
    MissingServiceKeywords,
    InsufficientCoverage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceGap {
    pub service: String,
    pub gap_type: ServiceGapKind,
    pub severity: Severity,
    pub current_keywords: usize,
    pub recommendation: String,
    pub suggested_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketReport {
    pub themes: Vec<ThemeInsight>,
    pub new_keywords: Vec<KeywordOpportunity>,
    pub location: LocationOpportunity,
    pub service_gaps: Vec<ServiceGap>,
}

struct CompiledTheme {
    name: String,
    pattern: Regex,
}

pub struct MarketInsights {
    config: MarketConfig,
    themes: Vec<CompiledTheme>,
    location: Regex,
}

impl MarketInsights {
    /// Compile the theme and location patterns. Terms are matched as
    /// case-insensitive literals.
    pub fn new(config: &MarketConfig) -> CampaignResult<Self> {
        let themes = config
            .themes
            .iter()
            .map(|t| {
                Ok(CompiledTheme {
                    name: t.name.clone(),
                    pattern: any_of(&t.terms, &t.name)?,
                })
            })
            .collect::<CampaignResult<Vec<_>>>()?;
        let location = any_of(&config.location_terms, "location")?;
        Ok(Self {
            config: config.clone(),
            themes,
            location,
        })
    }

    pub fn analyze(&self, rows: &[MeasuredRecord]) -> MarketReport {
        let report = MarketReport {
            themes: self.themes(rows),
            new_keywords: self.new_keyword_opportunities(rows),
            location: self.location_opportunity(rows),
            service_gaps: self.service_gaps(rows),
        };
        debug!(
            themes = report.themes.len(),
            new_keywords = report.new_keywords.len(),
            service_gaps = report.service_gaps.len(),
            "market insights complete"
        );
        report
    }

    /// Themes with at least one matching keyword, most conversions first.
    pub fn themes(&self, rows: &[MeasuredRecord]) -> Vec<ThemeInsight> {
        let mut out: Vec<ThemeInsight> = self
            .themes
            .iter()
            .filter_map(|theme| {
                let matching: Vec<&MeasuredRecord> = rows
                    .iter()
                    .filter(|r| theme.pattern.is_match(r.subject()))
                    .collect();
                if matching.is_empty() {
                    return None;
                }
                let totals = Counters::total(matching.iter().map(|r| r.counters()));
                let metrics = derive(&totals);
                let trend_strength = if totals.conversions > self.config.strong_theme_conversions {
                    ThemeStrength::Strong
                } else if totals.conversions > 0.0 {
                    ThemeStrength::Moderate
                } else {
                    ThemeStrength::Weak
                };
                let opportunity_level = if totals.impressions > HIGH_OPPORTUNITY_IMPRESSIONS
                    && metrics.conversion_rate > HIGH_OPPORTUNITY_CONVERSION_RATE
                {
                    Priority::High
                } else if totals.impressions > MEDIUM_OPPORTUNITY_IMPRESSIONS {
                    Priority::Medium
                } else {
                    Priority::Low
                };
                Some(ThemeInsight {
                    theme: theme.name.clone(),
                    keyword_count: matching.len(),
                    total_impressions: totals.impressions,
                    total_clicks: totals.clicks,
                    ctr: round2(metrics.ctr),
                    total_conversions: totals.conversions,
                    conversion_rate: round2(metrics.conversion_rate),
                    trend_strength,
                    opportunity_level,
                })
            })
            .collect();
        out.sort_by(|a, b| b.total_conversions.total_cmp(&a.total_conversions));
        out
    }

    /// Catalog keywords not already in the portfolio. Urgency terms make a
    /// candidate High priority.
    pub fn new_keyword_opportunities(&self, rows: &[MeasuredRecord]) -> Vec<KeywordOpportunity> {
        let existing: Vec<String> = rows.iter().map(|r| r.subject().to_lowercase()).collect();
        self.config
            .candidate_keywords
            .iter()
            .filter(|c| !existing.contains(&c.keyword.to_lowercase()))
            .map(|c| {
                let lowered = c.keyword.to_lowercase();
                let urgent = self
                    .config
                    .urgency_terms
                    .iter()
                    .any(|t| lowered.contains(&t.to_lowercase()));
                KeywordOpportunity {
                    suggested_keyword: c.keyword.clone(),
                    intent: c.intent.clone(),
                    recommended_match_type: MatchType::Exact,
                    estimated_monthly_searches: self.config.candidate_monthly_searches,
                    priority: if urgent { Priority::High } else { Priority::Medium },
                    reason: "Aligns with offered services and high-intent searches".to_string(),
                    action: format!("Add '{}' as exact match", c.keyword),
                }
            })
            .collect()
    }

    pub fn location_opportunity(&self, rows: &[MeasuredRecord]) -> LocationOpportunity {
        let matching: Vec<&MeasuredRecord> = rows
            .iter()
            .filter(|r| self.location.is_match(r.subject()))
            .collect();
        let totals = Counters::total(matching.iter().map(|r| r.counters()));
        if matching.is_empty() {
            LocationOpportunity {
                status: LocationStatus::GapIdentified,
                keyword_count: 0,
                total_impressions: 0,
                total_conversions: 0.0,
                recommendation: format!(
                    "Add location keywords: {} specific terms",
                    self.config.location_terms.join(", ")
                ),
                suggested_keywords: self.config.location_suggestions.clone(),
            }
        } else {
            LocationOpportunity {
                status: LocationStatus::Active,
                keyword_count: matching.len(),
                total_impressions: totals.impressions,
                total_conversions: totals.conversions,
                recommendation: "Increase bids for high-performing location keywords".to_string(),
                suggested_keywords: Vec::new(),
            }
        }
    }

    /// Core services with no keywords, or fewer than the configured minimum.
    pub fn service_gaps(&self, rows: &[MeasuredRecord]) -> Vec<ServiceGap> {
        let min = self.config.min_service_keywords;
        let area = self
            .config
            .location_terms
            .first()
            .cloned()
            .unwrap_or_else(|| "near me".to_string());
        let mut out = Vec::new();
        for service in &self.config.core_services {
            let needle = service.to_lowercase();
            let count = rows
                .iter()
                .filter(|r| r.subject().to_lowercase().contains(&needle))
                .count();
            if count == 0 {
                out.push(ServiceGap {
                    service: service.clone(),
                    gap_type: ServiceGapKind::MissingServiceKeywords,
                    severity: Severity::High,
                    current_keywords: 0,
                    recommendation: format!("Add keywords targeting '{service}'"),
                    suggested_keywords: vec![
                        format!("{service} {area}"),
                        format!("best {service}"),
                        format!("{service} near me"),
                        format!("professional {service}"),
                    ],
                });
            } else if count < min {
                out.push(ServiceGap {
                    service: service.clone(),
                    gap_type: ServiceGapKind::InsufficientCoverage,
                    severity: Severity::Medium,
                    current_keywords: count,
                    recommendation: format!(
                        "Expand {service} keyword coverage: add {} more keyword variants",
                        min - count
                    ),
                    suggested_keywords: Vec::new(),
                });
            }
        }
        out
    }
}

fn any_of(terms: &[String], label: &str) -> CampaignResult<Regex> {
    let alternation = terms
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    // An empty term list must match nothing.
    let pattern = if alternation.is_empty() {
        r"[^\s\S]".to_string()
    } else {
        format!("(?i)(?:{alternation})")
    };
    Regex::new(&pattern).map_err(|e| CampaignError::analyzer("market_insights", format!("{label}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_analytics::measure::measure;
    use campaign_core::config::{CandidateKeyword, Theme};
    use campaign_core::types::RawRecord;

    fn kw(text: &str, counters: Counters) -> MeasuredRecord {
        measure(RawRecord::keyword("Search", text, MatchType::Exact, counters))
    }

    fn insights() -> MarketInsights {
        MarketInsights::new(&MarketConfig::default()).unwrap()
    }

    #[test]
    fn test_theme_grouping_and_order() {
        let rows = [
            kw("sofa cleaning", Counters::new(600, 30, 50.0, 2.0)),
            kw("express laundry", Counters::new(800, 40, 60.0, 8.0)),
        ];
        let themes = insights().themes(&rows);
        assert_eq!(themes[0].theme, "laundry");
        assert!((themes[0].total_conversions - 8.0).abs() < f64::EPSILON);
        assert_eq!(themes[0].trend_strength, ThemeStrength::Strong);
        assert_eq!(themes[0].opportunity_level, Priority::High);
        let sofa = themes.iter().find(|t| t.theme == "sofa").unwrap();
        assert_eq!(sofa.trend_strength, ThemeStrength::Moderate);
        assert!(themes.iter().all(|t| t.theme != "corporate"));
    }

    #[test]
    fn test_theme_terms_are_literal() {
        let config = MarketConfig {
            themes: vec![Theme {
                name: "odd".into(),
                terms: vec!["24/7 (open)".into(), "a+b".into()],
            }],
            ..MarketConfig::default()
        };
        let market = MarketInsights::new(&config).unwrap();
        let rows = [kw("laundry 24/7 (open)", Counters::new(10, 1, 1.0, 0.0)), kw("aab", Counters::default())];
        let themes = market.themes(&rows);
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].keyword_count, 1);
    }

    #[test]
    fn test_new_keyword_candidates_skip_existing() {
        let config = MarketConfig {
            candidate_keywords: vec![
                CandidateKeyword {
                    keyword: "express laundry".into(),
                    intent: "urgent".into(),
                },
                CandidateKeyword {
                    keyword: "wedding dress cleaning".into(),
                    intent: "occasion".into(),
                },
                CandidateKeyword {
                    keyword: "laundry pickup delivery".into(),
                    intent: "convenience".into(),
                },
            ],
            ..MarketConfig::default()
        };
        let market = MarketInsights::new(&config).unwrap();
        let rows = [kw("express laundry", Counters::default())];
        let ops = market.new_keyword_opportunities(&rows);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].priority, Priority::Medium);
        assert_eq!(ops[1].priority, Priority::High);
        assert_eq!(ops[1].estimated_monthly_searches, 50);
        assert_eq!(ops[1].recommended_match_type, MatchType::Exact);
    }

    #[test]
    fn test_location_gap_and_active() {
        let m = insights();
        let gap = m.location_opportunity(&[kw("sofa cleaning", Counters::default())]);
        assert_eq!(gap.status, LocationStatus::GapIdentified);
        assert_eq!(gap.suggested_keywords.len(), 5);

        let active = m.location_opportunity(&[kw("laundry Dubai", Counters::new(100, 5, 5.0, 1.0))]);
        assert_eq!(active.status, LocationStatus::Active);
        assert_eq!(active.total_impressions, 100);
    }

    #[test]
    fn test_service_gaps() {
        let rows = [
            kw("sofa cleaning", Counters::default()),
            kw("sofa cleaning dubai", Counters::default()),
            kw("carpet cleaning", Counters::default()),
            kw("best carpet cleaning", Counters::default()),
            kw("carpet cleaning near me", Counters::default()),
        ];
        let gaps = insights().service_gaps(&rows);
        let summary: Vec<(&str, ServiceGapKind)> =
            gaps.iter().map(|g| (g.service.as_str(), g.gap_type)).collect();
        assert_eq!(
            summary,
            vec![
                ("sofa cleaning", ServiceGapKind::InsufficientCoverage),
                ("curtain cleaning", ServiceGapKind::MissingServiceKeywords),
                ("corporate laundry", ServiceGapKind::MissingServiceKeywords),
            ]
        );
        assert_eq!(gaps[1].suggested_keywords[0], "curtain cleaning dubai");
    }
}
