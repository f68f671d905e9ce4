use serde::{Deserialize, Deserializer};
use std::path::Path;

use crate::taxonomy;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `CAMPAIGN_INSIGHTS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

// ─── Analysis Config ────────────────────────────────────────────────────────

/// Everything the analyzers need: thresholds, taxonomies and the ROI
/// assumptions. Passed by reference into every analyzer constructor.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default = "RuleThresholds::campaign", deserialize_with = "campaign_rules")]
    pub campaign_rules: RuleThresholds,
    #[serde(default = "RuleThresholds::keyword", deserialize_with = "keyword_rules")]
    pub keyword_rules: RuleThresholds,
    #[serde(default)]
    pub trends: TrendThresholds,
    #[serde(default)]
    pub match_types: MatchTypeThresholds,
    #[serde(default)]
    pub lost_demand: LostDemandConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub relevance: RelevanceConfig,
    #[serde(default)]
    pub business: BusinessConfig,
    #[serde(default)]
    pub assumptions: RoiAssumptions,
}

fn default_currency() -> String {
    "AED".to_string()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            ingest: IngestConfig::default(),
            campaign_rules: RuleThresholds::campaign(),
            keyword_rules: RuleThresholds::keyword(),
            trends: TrendThresholds::default(),
            match_types: MatchTypeThresholds::default(),
            lost_demand: LostDemandConfig::default(),
            market: MarketConfig::default(),
            relevance: RelevanceConfig::default(),
            business: BusinessConfig::default(),
            assumptions: RoiAssumptions::default(),
        }
    }
}

// ─── Ingest Config ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Header rows to skip, tried in order until the required columns appear.
    #[serde(default = "default_header_skip_candidates")]
    pub header_skip_candidates: Vec<usize>,
    #[serde(default = "default_campaign_placeholder")]
    pub default_campaign_name: String,
    #[serde(default = "default_ad_group_placeholder")]
    pub default_ad_group_name: String,
    #[serde(default = "default_low_volume_impressions")]
    pub low_volume_impressions: u64,
}

fn default_header_skip_candidates() -> Vec<usize> {
    vec![0, 2, 3]
}
fn default_campaign_placeholder() -> String {
    "Website Traffic".to_string()
}
fn default_ad_group_placeholder() -> String {
    "Keywords".to_string()
}
fn default_low_volume_impressions() -> u64 {
    100
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            header_skip_candidates: default_header_skip_candidates(),
            default_campaign_name: default_campaign_placeholder(),
            default_ad_group_name: default_ad_group_placeholder(),
            low_volume_impressions: default_low_volume_impressions(),
        }
    }
}

// ─── Rule Thresholds ────────────────────────────────────────────────────────

/// Thresholds for one issue-detection track. Rules whose threshold is
/// `None` are not part of the track.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleThresholds {
    pub high_cpa: f64,
    pub critical_cpa: f64,
    pub low_ctr: f64,
    pub ctr_min_impressions: f64,
    pub low_conversion_rate: Option<f64>,
    pub conversion_rate_min_clicks: f64,
    pub low_roas: f64,
    pub roas_min_cost: f64,
    pub high_spend: f64,
    pub low_return_conversions: f64,
    pub no_clicks_min_impressions: Option<f64>,
    pub no_conversions_min_clicks: Option<f64>,
}

impl RuleThresholds {
    pub fn campaign() -> Self {
        Self {
            high_cpa: 500.0,
            critical_cpa: 1000.0,
            low_ctr: 1.0,
            ctr_min_impressions: 100.0,
            low_conversion_rate: Some(1.0),
            conversion_rate_min_clicks: 50.0,
            low_roas: 1.5,
            roas_min_cost: 100.0,
            high_spend: 5000.0,
            low_return_conversions: 10.0,
            no_clicks_min_impressions: None,
            no_conversions_min_clicks: None,
        }
    }

    pub fn keyword() -> Self {
        Self {
            high_cpa: 300.0,
            low_conversion_rate: None,
            high_spend: 500.0,
            low_return_conversions: 2.0,
            no_clicks_min_impressions: Some(50.0),
            no_conversions_min_clicks: Some(10.0),
            ..Self::campaign()
        }
    }
}

/// A partial rule table. Keys left out keep the track's own default, so
/// the campaign and keyword tracks can be tuned one threshold at a time.
#[derive(Debug, Default, Deserialize)]
struct RuleOverrides {
    high_cpa: Option<f64>,
    critical_cpa: Option<f64>,
    low_ctr: Option<f64>,
    ctr_min_impressions: Option<f64>,
    low_conversion_rate: Option<f64>,
    conversion_rate_min_clicks: Option<f64>,
    low_roas: Option<f64>,
    roas_min_cost: Option<f64>,
    high_spend: Option<f64>,
    low_return_conversions: Option<f64>,
    no_clicks_min_impressions: Option<f64>,
    no_conversions_min_clicks: Option<f64>,
}

impl RuleOverrides {
    fn apply(self, base: RuleThresholds) -> RuleThresholds {
        RuleThresholds {
            high_cpa: self.high_cpa.unwrap_or(base.high_cpa),
            critical_cpa: self.critical_cpa.unwrap_or(base.critical_cpa),
            low_ctr: self.low_ctr.unwrap_or(base.low_ctr),
            ctr_min_impressions: self.ctr_min_impressions.unwrap_or(base.ctr_min_impressions),
            low_conversion_rate: self.low_conversion_rate.or(base.low_conversion_rate),
            conversion_rate_min_clicks: self
                .conversion_rate_min_clicks
                .unwrap_or(base.conversion_rate_min_clicks),
            low_roas: self.low_roas.unwrap_or(base.low_roas),
            roas_min_cost: self.roas_min_cost.unwrap_or(base.roas_min_cost),
            high_spend: self.high_spend.unwrap_or(base.high_spend),
            low_return_conversions: self
                .low_return_conversions
                .unwrap_or(base.low_return_conversions),
            no_clicks_min_impressions: self
                .no_clicks_min_impressions
                .or(base.no_clicks_min_impressions),
            no_conversions_min_clicks: self
                .no_conversions_min_clicks
                .or(base.no_conversions_min_clicks),
        }
    }
}

fn campaign_rules<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RuleThresholds, D::Error> {
    RuleOverrides::deserialize(deserializer).map(|o| o.apply(RuleThresholds::campaign()))
}

fn keyword_rules<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RuleThresholds, D::Error> {
    RuleOverrides::deserialize(deserializer).map(|o| o.apply(RuleThresholds::keyword()))
}

// ─── Trend Thresholds ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct TrendThresholds {
    #[serde(default = "default_efficiency_decline_ratio")]
    pub efficiency_decline_ratio: f64,
    #[serde(default = "default_efficiency_critical_ratio")]
    pub efficiency_critical_ratio: f64,
    /// Relative drop (0.5 = 50%) that counts as sudden.
    #[serde(default = "default_sudden_drop_ratio")]
    pub sudden_drop_ratio: f64,
    #[serde(default = "default_high_spend_multiplier")]
    pub high_spend_multiplier: f64,
    #[serde(default = "default_loss_roas")]
    pub low_roas: f64,
    #[serde(default = "default_low_roas_medium_floor")]
    pub low_roas_medium_floor: f64,
    #[serde(default = "default_loss_min_cost")]
    pub min_cost: f64,
    #[serde(default = "default_strong_trend_ratio")]
    pub strong_trend_ratio: f64,
    #[serde(default = "default_unstable_volatility")]
    pub unstable_volatility_pct: f64,
    #[serde(default = "default_moderate_volatility")]
    pub moderate_volatility_pct: f64,
}

fn default_efficiency_decline_ratio() -> f64 {
    1.3
}
fn default_efficiency_critical_ratio() -> f64 {
    1.5
}
fn default_sudden_drop_ratio() -> f64 {
    0.5
}
fn default_high_spend_multiplier() -> f64 {
    1.5
}
fn default_loss_roas() -> f64 {
    1.0
}
fn default_low_roas_medium_floor() -> f64 {
    0.7
}
fn default_loss_min_cost() -> f64 {
    100.0
}
fn default_strong_trend_ratio() -> f64 {
    0.3
}
fn default_unstable_volatility() -> f64 {
    50.0
}
fn default_moderate_volatility() -> f64 {
    25.0
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            efficiency_decline_ratio: default_efficiency_decline_ratio(),
            efficiency_critical_ratio: default_efficiency_critical_ratio(),
            sudden_drop_ratio: default_sudden_drop_ratio(),
            high_spend_multiplier: default_high_spend_multiplier(),
            low_roas: default_loss_roas(),
            low_roas_medium_floor: default_low_roas_medium_floor(),
            min_cost: default_loss_min_cost(),
            strong_trend_ratio: default_strong_trend_ratio(),
            unstable_volatility_pct: default_unstable_volatility(),
            moderate_volatility_pct: default_moderate_volatility(),
        }
    }
}

// ─── Match Type Thresholds ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct MatchTypeThresholds {
    #[serde(default = "default_broad_min_clicks")]
    pub broad_min_clicks: u64,
    #[serde(default = "default_broad_promote_cvr")]
    pub broad_promote_conversion_rate: f64,
    #[serde(default = "default_broad_narrow_ctr")]
    pub broad_narrow_ctr: f64,
    #[serde(default = "default_broad_narrow_impressions")]
    pub broad_narrow_min_impressions: u64,
    #[serde(default = "default_phrase_min_clicks")]
    pub phrase_min_clicks: u64,
    #[serde(default = "default_phrase_promote_cvr")]
    pub phrase_promote_conversion_rate: f64,
    #[serde(default = "default_exact_landing_cvr")]
    pub exact_landing_page_conversion_rate: f64,
    #[serde(default = "default_exact_landing_ctr")]
    pub exact_landing_page_ctr: f64,
}

fn default_broad_min_clicks() -> u64 {
    5
}
fn default_broad_promote_cvr() -> f64 {
    2.0
}
fn default_broad_narrow_ctr() -> f64 {
    1.0
}
fn default_broad_narrow_impressions() -> u64 {
    100
}
fn default_phrase_min_clicks() -> u64 {
    10
}
fn default_phrase_promote_cvr() -> f64 {
    3.0
}
fn default_exact_landing_cvr() -> f64 {
    0.5
}
fn default_exact_landing_ctr() -> f64 {
    2.0
}

impl Default for MatchTypeThresholds {
    fn default() -> Self {
        Self {
            broad_min_clicks: default_broad_min_clicks(),
            broad_promote_conversion_rate: default_broad_promote_cvr(),
            broad_narrow_ctr: default_broad_narrow_ctr(),
            broad_narrow_min_impressions: default_broad_narrow_impressions(),
            phrase_min_clicks: default_phrase_min_clicks(),
            phrase_promote_conversion_rate: default_phrase_promote_cvr(),
            exact_landing_page_conversion_rate: default_exact_landing_cvr(),
            exact_landing_page_ctr: default_exact_landing_ctr(),
        }
    }
}

// ─── Lost Demand Config ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LostDemandConfig {
    #[serde(default = "default_waste_min_impressions")]
    pub waste_min_impressions: u64,
    #[serde(default = "default_waste_max_ctr")]
    pub waste_max_ctr: f64,
    #[serde(default = "default_leak_min_clicks")]
    pub leak_min_clicks: u64,
    #[serde(default = "default_sibling_min_clicks")]
    pub exact_sibling_min_clicks: u64,
    #[serde(default = "default_intent_mismatch_ctr")]
    pub intent_mismatch_ctr: f64,
    #[serde(default = "default_intent_mismatch_min_clicks")]
    pub intent_mismatch_min_clicks: u64,
    #[serde(default = "default_exact_low_ctr")]
    pub exact_low_ctr: f64,
    #[serde(default = "default_exact_low_ctr_min_impressions")]
    pub exact_low_ctr_min_impressions: u64,
    #[serde(default = "default_min_coverage_impressions")]
    pub min_coverage_impressions: u64,
    /// Monthly searches assumed for a high-intent phrase no keyword covers.
    #[serde(default = "default_uncovered_phrase_searches")]
    pub uncovered_phrase_searches: u64,
    #[serde(default = "taxonomy::high_intent_phrases")]
    pub high_intent_phrases: Vec<String>,
}

fn default_waste_min_impressions() -> u64 {
    100
}
fn default_waste_max_ctr() -> f64 {
    1.0
}
fn default_leak_min_clicks() -> u64 {
    10
}
fn default_sibling_min_clicks() -> u64 {
    5
}
fn default_intent_mismatch_ctr() -> f64 {
    3.0
}
fn default_intent_mismatch_min_clicks() -> u64 {
    5
}
fn default_exact_low_ctr() -> f64 {
    0.5
}
fn default_exact_low_ctr_min_impressions() -> u64 {
    50
}
fn default_min_coverage_impressions() -> u64 {
    50
}
fn default_uncovered_phrase_searches() -> u64 {
    50
}

impl Default for LostDemandConfig {
    fn default() -> Self {
        Self {
            waste_min_impressions: default_waste_min_impressions(),
            waste_max_ctr: default_waste_max_ctr(),
            leak_min_clicks: default_leak_min_clicks(),
            exact_sibling_min_clicks: default_sibling_min_clicks(),
            intent_mismatch_ctr: default_intent_mismatch_ctr(),
            intent_mismatch_min_clicks: default_intent_mismatch_min_clicks(),
            exact_low_ctr: default_exact_low_ctr(),
            exact_low_ctr_min_impressions: default_exact_low_ctr_min_impressions(),
            min_coverage_impressions: default_min_coverage_impressions(),
            uncovered_phrase_searches: default_uncovered_phrase_searches(),
            high_intent_phrases: taxonomy::high_intent_phrases(),
        }
    }
}

// ─── Market Config ──────────────────────────────────────────────────────────

/// A named group of substrings used to bucket keywords.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Theme {
    pub name: String,
    pub terms: Vec<String>,
}

/// A keyword the advertiser should consider adding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CandidateKeyword {
    pub keyword: String,
    pub intent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "taxonomy::market_themes")]
    pub themes: Vec<Theme>,
    #[serde(default = "taxonomy::candidate_keywords")]
    pub candidate_keywords: Vec<CandidateKeyword>,
    #[serde(default = "taxonomy::urgency_terms")]
    pub urgency_terms: Vec<String>,
    #[serde(default = "taxonomy::location_terms")]
    pub location_terms: Vec<String>,
    #[serde(default = "taxonomy::location_suggestions")]
    pub location_suggestions: Vec<String>,
    #[serde(default = "taxonomy::core_services")]
    pub core_services: Vec<String>,
    #[serde(default = "default_candidate_searches")]
    pub candidate_monthly_searches: u64,
    #[serde(default = "default_strong_theme_conversions")]
    pub strong_theme_conversions: f64,
    #[serde(default = "default_min_service_keywords")]
    pub min_service_keywords: usize,
}

fn default_candidate_searches() -> u64 {
    50
}
fn default_strong_theme_conversions() -> f64 {
    5.0
}
fn default_min_service_keywords() -> usize {
    3
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            themes: taxonomy::market_themes(),
            candidate_keywords: taxonomy::candidate_keywords(),
            urgency_terms: taxonomy::urgency_terms(),
            location_terms: taxonomy::location_terms(),
            location_suggestions: taxonomy::location_suggestions(),
            core_services: taxonomy::core_services(),
            candidate_monthly_searches: default_candidate_searches(),
            strong_theme_conversions: default_strong_theme_conversions(),
            min_service_keywords: default_min_service_keywords(),
        }
    }
}

// ─── Relevance Config ───────────────────────────────────────────────────────

/// A service offered on the advertiser's website.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceDefinition {
    pub id: String,
    pub name: String,
    pub url: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub related_keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceConfig {
    #[serde(default = "taxonomy::website_services")]
    pub services: Vec<ServiceDefinition>,
    #[serde(default = "default_min_service_coverage")]
    pub min_keywords_per_service: usize,
    #[serde(default = "default_weak_alignment")]
    pub weak_alignment_threshold: f64,
    #[serde(default = "default_misaligned_spend")]
    pub misaligned_spend_threshold: f64,
}

fn default_min_service_coverage() -> usize {
    3
}
fn default_weak_alignment() -> f64 {
    0.7
}
fn default_misaligned_spend() -> f64 {
    100.0
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            services: taxonomy::website_services(),
            min_keywords_per_service: default_min_service_coverage(),
            weak_alignment_threshold: default_weak_alignment(),
            misaligned_spend_threshold: default_misaligned_spend(),
        }
    }
}

// ─── Business Config ────────────────────────────────────────────────────────

/// Business service with the substrings that identify its campaigns and
/// the share of budget it is expected to receive.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BusinessService {
    pub name: String,
    pub terms: Vec<String>,
    pub expected_importance: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlatformTarget {
    pub campaign_type: String,
    pub target_share: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicyKind {
    /// Split a campaign evenly across every matched service.
    Even,
    /// Attribute a campaign to its first matched service only.
    FirstMatch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusinessConfig {
    #[serde(default = "taxonomy::business_services")]
    pub services: Vec<BusinessService>,
    #[serde(default = "taxonomy::platform_targets")]
    pub platform_targets: Vec<PlatformTarget>,
    #[serde(default = "default_split_policy")]
    pub split_policy: SplitPolicyKind,
    #[serde(default = "default_roas_weight")]
    pub roas_weight: f64,
    #[serde(default = "default_conversion_rate_weight")]
    pub conversion_rate_weight: f64,
    /// Percentage points of drift tolerated before a platform is misaligned.
    #[serde(default = "default_platform_tolerance")]
    pub platform_tolerance_pct: f64,
    #[serde(default = "default_growth_roas")]
    pub growth_roas: f64,
    #[serde(default = "default_growth_multiplier")]
    pub growth_budget_multiplier: f64,
    #[serde(default = "default_increase_roi")]
    pub budget_increase_min_roi: f64,
    #[serde(default = "default_decrease_roi")]
    pub budget_decrease_max_roi: f64,
}

fn default_split_policy() -> SplitPolicyKind {
    SplitPolicyKind::Even
}
fn default_roas_weight() -> f64 {
    0.6
}
fn default_conversion_rate_weight() -> f64 {
    0.4
}
fn default_platform_tolerance() -> f64 {
    5.0
}
fn default_growth_roas() -> f64 {
    2.0
}
fn default_growth_multiplier() -> f64 {
    1.3
}
fn default_increase_roi() -> f64 {
    1.5
}
fn default_decrease_roi() -> f64 {
    1.0
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            services: taxonomy::business_services(),
            platform_targets: taxonomy::platform_targets(),
            split_policy: default_split_policy(),
            roas_weight: default_roas_weight(),
            conversion_rate_weight: default_conversion_rate_weight(),
            platform_tolerance_pct: default_platform_tolerance(),
            growth_roas: default_growth_roas(),
            growth_budget_multiplier: default_growth_multiplier(),
            budget_increase_min_roi: default_increase_roi(),
            budget_decrease_max_roi: default_decrease_roi(),
        }
    }
}

// ─── ROI Assumptions ────────────────────────────────────────────────────────

/// Constants behind every projected financial impact.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RoiAssumptions {
    #[serde(default = "default_avg_cpc")]
    pub avg_cpc: f64,
    /// Fraction, not percent.
    #[serde(default = "default_baseline_cvr")]
    pub baseline_conversion_rate: f64,
    #[serde(default = "default_avg_order_value")]
    pub avg_order_value: f64,
}

fn default_avg_cpc() -> f64 {
    2.5
}
fn default_baseline_cvr() -> f64 {
    0.05
}
fn default_avg_order_value() -> f64 {
    200.0
}

impl Default for RoiAssumptions {
    fn default() -> Self {
        Self {
            avg_cpc: default_avg_cpc(),
            baseline_conversion_rate: default_baseline_cvr(),
            avg_order_value: default_avg_order_value(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then environment
    /// variables (which win).
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("CAMPAIGN_INSIGHTS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_track_thresholds_stay_distinct() {
        let campaign = RuleThresholds::campaign();
        let keyword = RuleThresholds::keyword();
        assert!((campaign.high_cpa - 500.0).abs() < f64::EPSILON);
        assert!((keyword.high_cpa - 300.0).abs() < f64::EPSILON);
        assert!(campaign.no_clicks_min_impressions.is_none());
        assert_eq!(keyword.no_clicks_min_impressions, Some(50.0));
        assert!(keyword.low_conversion_rate.is_none());
        assert!((keyword.low_ctr - campaign.low_ctr).abs() < f64::EPSILON);
    }

    #[test]
    fn test_defaults_carry_taxonomies() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.currency, "AED");
        assert_eq!(cfg.ingest.header_skip_candidates, vec![0, 2, 3]);
        assert!(!cfg.relevance.services.is_empty());
        assert!(!cfg.lost_demand.high_intent_phrases.is_empty());
        let importance: f64 = cfg.business.services.iter().map(|s| s.expected_importance).sum();
        assert!((importance - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_from_toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[api]
http_port = 9000

[analysis]
currency = "USD"

[analysis.assumptions]
avg_cpc = 4.0

[[analysis.market.themes]]
name = "pets"
terms = ["dog", "cat"]
"#
        )
        .unwrap();

        let cfg = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.api.http_port, 9000);
        assert_eq!(cfg.analysis.currency, "USD");
        assert!((cfg.analysis.assumptions.avg_cpc - 4.0).abs() < f64::EPSILON);
        assert!((cfg.analysis.assumptions.avg_order_value - 200.0).abs() < f64::EPSILON);
        assert_eq!(cfg.analysis.market.themes.len(), 1);
        assert_eq!(cfg.analysis.market.themes[0].name, "pets");
        assert!((cfg.analysis.keyword_rules.high_cpa - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_single_rule_override_keeps_track_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[analysis.campaign_rules]
high_cpa = 600

[analysis.keyword_rules]
no_clicks_min_impressions = 80
"#
        )
        .unwrap();

        let cfg = AppConfig::load(Some(file.path())).unwrap();
        let campaign = &cfg.analysis.campaign_rules;
        assert!((campaign.high_cpa - 600.0).abs() < f64::EPSILON);
        assert!((campaign.critical_cpa - 1000.0).abs() < f64::EPSILON);
        assert_eq!(campaign.low_conversion_rate, Some(1.0));
        assert!(campaign.no_clicks_min_impressions.is_none());

        let keyword = &cfg.analysis.keyword_rules;
        assert_eq!(keyword.no_clicks_min_impressions, Some(80.0));
        assert!((keyword.high_cpa - 300.0).abs() < f64::EPSILON);
        assert!(keyword.low_conversion_rate.is_none());
    }

    #[test]
    fn test_example_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../config/campaign-insights.example.toml");
        let cfg = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.analysis.business.split_policy, SplitPolicyKind::Even);
        assert_eq!(cfg.analysis.business.platform_targets.len(), 4);
        assert_eq!(cfg.analysis.campaign_rules.low_conversion_rate, Some(1.0));
        assert!(cfg.analysis.campaign_rules.no_clicks_min_impressions.is_none());
    }
}
