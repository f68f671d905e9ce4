use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Raw data ───────────────────────────────────────────────────────────────

/// Raw performance counters as exported by the ads platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    pub impressions: u64,
    pub clicks: u64,
    pub cost: f64,
    pub conversions: f64,
    /// Conversion value. Absent when the export has no value column.
    #[serde(default)]
    pub revenue: Option<f64>,
}

impl Counters {
    pub fn new(impressions: u64, clicks: u64, cost: f64, conversions: f64) -> Self {
        Self {
            impressions,
            clicks,
            cost,
            conversions,
            revenue: None,
        }
    }

    pub fn with_revenue(mut self, revenue: f64) -> Self {
        self.revenue = Some(revenue);
        self
    }

    /// Add another set of counters into this one. Revenue stays absent
    /// only if it is absent on both sides.
    pub fn accumulate(&mut self, other: &Counters) {
        self.impressions += other.impressions;
        self.clicks += other.clicks;
        self.cost += other.cost;
        self.conversions += other.conversions;
        self.revenue = match (self.revenue, other.revenue) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
        };
    }

    pub fn total<'a>(items: impl IntoIterator<Item = &'a Counters>) -> Counters {
        let mut sum = Counters::default();
        for c in items {
            sum.accumulate(c);
        }
        sum
    }

    pub fn revenue_or_zero(&self) -> f64 {
        self.revenue.unwrap_or(0.0)
    }
}

/// Reporting month attached to rows of a multi-month upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthTag {
    /// Label as it appeared in the file name, e.g. "Mar 2025".
    pub label: String,
    /// Monotonic month number used for ordering (`year * 12 + month0`).
    pub index: i32,
}

/// Keyword match type. Unknown labels are kept verbatim so they can be
/// reported by data-quality validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchType {
    Exact,
    Phrase,
    Broad,
    ModifiedBroad,
    Other(String),
}

impl MatchType {
    /// Parse an export label such as `Phrase match` or `"exact"`.
    pub fn from_label(raw: &str) -> Self {
        let cleaned = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'')
            .trim()
            .to_lowercase();
        let base = cleaned.strip_suffix(" match").unwrap_or(&cleaned).trim();
        match base {
            "exact" => Self::Exact,
            "phrase" => Self::Phrase,
            "broad" => Self::Broad,
            "modified broad" | "broad modified" | "bmm" => Self::ModifiedBroad,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact => "exact",
            Self::Phrase => "phrase",
            Self::Broad => "broad",
            Self::ModifiedBroad => "modified broad",
            Self::Other(s) => s,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for MatchType {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<MatchType> for String {
    fn from(value: MatchType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a normalized export: a campaign (optionally per month or per
/// day) or a keyword.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub campaign_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<MonthTag>,
    #[serde(flatten)]
    pub counters: Counters,
}

impl RawRecord {
    pub fn campaign(name: impl Into<String>, counters: Counters) -> Self {
        Self {
            campaign_name: name.into(),
            counters,
            ..Default::default()
        }
    }

    pub fn keyword(
        campaign: impl Into<String>,
        keyword: impl Into<String>,
        match_type: MatchType,
        counters: Counters,
    ) -> Self {
        Self {
            campaign_name: campaign.into(),
            keyword: Some(keyword.into()),
            match_type: Some(match_type),
            counters,
            ..Default::default()
        }
    }

    pub fn in_month(mut self, label: impl Into<String>, index: i32) -> Self {
        self.month = Some(MonthTag {
            label: label.into(),
            index,
        });
        self
    }

    /// Keyword text for keyword rows, campaign name otherwise.
    pub fn subject(&self) -> &str {
        self.keyword.as_deref().unwrap_or(&self.campaign_name)
    }
}

// ─── Derived metrics ────────────────────────────────────────────────────────

/// Rate metrics derived from a [`Counters`] value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Click-through rate in percent.
    pub ctr: f64,
    /// Conversions per click in percent.
    pub conversion_rate: f64,
    pub cpc: f64,
    /// Cost per acquisition; `None` when there were no conversions.
    pub cpa: Option<f64>,
    pub roas: f64,
    /// Percent of cost within the grouping scope, when one was computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend_share: Option<f64>,
}

/// A record together with the metrics derived from its counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredRecord {
    #[serde(flatten)]
    pub record: RawRecord,
    #[serde(flatten)]
    pub metrics: Metrics,
}

/// Addressable metric for threshold rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Impressions,
    Clicks,
    Cost,
    Conversions,
    Revenue,
    Ctr,
    ConversionRate,
    Cpc,
    Cpa,
    Roas,
}

impl MeasuredRecord {
    /// Value of `metric`, or `None` when it is undefined (CPA without
    /// conversions).
    pub fn value(&self, metric: Metric) -> Option<f64> {
        let c = &self.record.counters;
        match metric {
            Metric::Impressions => Some(c.impressions as f64),
            Metric::Clicks => Some(c.clicks as f64),
            Metric::Cost => Some(c.cost),
            Metric::Conversions => Some(c.conversions),
            Metric::Revenue => Some(c.revenue_or_zero()),
            Metric::Ctr => Some(self.metrics.ctr),
            Metric::ConversionRate => Some(self.metrics.conversion_rate),
            Metric::Cpc => Some(self.metrics.cpc),
            Metric::Cpa => self.metrics.cpa,
            Metric::Roas => Some(self.metrics.roas),
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.record.counters
    }

    pub fn subject(&self) -> &str {
        self.record.subject()
    }
}

// ─── Ranking enums ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

impl From<Severity> for Priority {
    fn from(s: Severity) -> Self {
        match s {
            Severity::High => Self::High,
            Severity::Medium => Self::Medium,
            Severity::Low => Self::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

// ─── Issues ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    HighCpa,
    LowCtr,
    LowConversionRate,
    LowRoas,
    HighSpendLowReturn,
    NoClicks,
    NoConversions,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighCpa => "HIGH_CPA",
            Self::LowCtr => "LOW_CTR",
            Self::LowConversionRate => "LOW_CONVERSION_RATE",
            Self::LowRoas => "LOW_ROAS",
            Self::HighSpendLowReturn => "HIGH_SPEND_LOW_RETURN",
            Self::NoClicks => "NO_CLICKS",
            Self::NoConversions => "NO_CONVERSIONS",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold rule that fired for one campaign or keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Campaign name or keyword text.
    pub subject: String,
    pub campaign_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    /// The metric value that tripped the rule.
    pub value: f64,
    /// Counters of the record that triggered the rule.
    pub volume: Counters,
    pub metrics: Metrics,
}

// ─── Recommendations ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    AuditIssue,
    MatchType,
    LostDemand,
    NewKeyword,
    CampaignIssue,
    CampaignPerformance,
}

/// Deterministic financial projection attached to a recommendation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactEstimate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_clicks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_conversions: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_impact: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_savings: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi_range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub subject: String,
    pub campaign_name: String,
    pub source: RecommendationSource,
    pub problem: String,
    /// Machine-friendly action label, e.g. `REDUCE_BID_OR_PAUSE`.
    pub action: String,
    /// Operator-facing description of what to do.
    pub detail: String,
    pub priority: Priority,
    pub confidence: Confidence,
    pub expected_impact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<ImpactEstimate>,
}

/// Stable sort by (priority, confidence), best first.
pub fn sort_recommendations(recs: &mut [Recommendation]) {
    recs.sort_by_key(|r| (r.priority.rank(), r.confidence.rank()));
}

/// Round to two decimals for presentation fields.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_type_labels_normalize() {
        assert_eq!(MatchType::from_label("Phrase match"), MatchType::Phrase);
        assert_eq!(MatchType::from_label("\"Exact\""), MatchType::Exact);
        assert_eq!(MatchType::from_label(" broad "), MatchType::Broad);
        assert_eq!(MatchType::from_label("Modified broad"), MatchType::ModifiedBroad);
        let other = MatchType::from_label("Smart");
        assert_eq!(other, MatchType::Other("smart".to_string()));
        assert!(!other.is_recognized());
    }

    #[test]
    fn test_match_type_serializes_as_plain_string() {
        let json = serde_json::to_string(&MatchType::Phrase).unwrap();
        assert_eq!(json, "\"phrase\"");
        let back: MatchType = serde_json::from_str("\"Exact match\"").unwrap();
        assert_eq!(back, MatchType::Exact);
    }

    #[test]
    fn test_counters_accumulate_revenue() {
        let mut a = Counters::new(100, 10, 50.0, 1.0);
        a.accumulate(&Counters::new(50, 5, 25.0, 0.5).with_revenue(80.0));
        assert_eq!(a.impressions, 150);
        assert_eq!(a.clicks, 15);
        assert!((a.cost - 75.0).abs() < f64::EPSILON);
        assert_eq!(a.revenue, Some(80.0));

        let none = Counters::total(&[Counters::default(), Counters::default()]);
        assert_eq!(none.revenue, None);
    }

    #[test]
    fn test_undefined_cpa_serializes_as_null() {
        let metrics = Metrics::default();
        let json = serde_json::to_value(metrics).unwrap();
        assert!(json["cpa"].is_null());
        assert!(json.get("spend_share").is_none());
    }

    #[test]
    fn test_recommendation_sort_is_stable() {
        let rec = |subject: &str, priority, confidence| Recommendation {
            subject: subject.to_string(),
            campaign_name: String::new(),
            source: RecommendationSource::AuditIssue,
            problem: String::new(),
            action: String::new(),
            detail: String::new(),
            priority,
            confidence,
            expected_impact: String::new(),
            estimate: None,
        };
        let mut recs = vec![
            rec("a", Priority::Medium, Confidence::High),
            rec("b", Priority::High, Confidence::Medium),
            rec("c", Priority::High, Confidence::High),
            rec("d", Priority::Critical, Confidence::Low),
            rec("e", Priority::High, Confidence::Medium),
        ];
        sort_recommendations(&mut recs);
        let order: Vec<&str> = recs.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(order, vec!["d", "c", "b", "e", "a"]);
    }
}
