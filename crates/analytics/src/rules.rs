//! Generic threshold rule engine. Both issue-detection tracks share this
//! evaluation loop and differ only in the [`RuleTable`] they load.

use campaign_core::config::RuleThresholds;
use campaign_core::types::{Issue, IssueType, MeasuredRecord, Metric, Severity};
use serde::Serialize;
use tracing::debug;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Campaign,
    Keyword,
}

impl Track {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Campaign => "campaign",
            Self::Keyword => "keyword",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    Above(f64),
    Below(f64),
    Zero,
}

/// `metric <cmp> threshold`. An undefined metric never satisfies a clause.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clause {
    pub metric: Metric,
    pub cmp: Comparison,
}

impl Clause {
    pub fn above(metric: Metric, threshold: f64) -> Self {
        Self {
            metric,
            cmp: Comparison::Above(threshold),
        }
    }

    pub fn below(metric: Metric, threshold: f64) -> Self {
        Self {
            metric,
            cmp: Comparison::Below(threshold),
        }
    }

    pub fn zero(metric: Metric) -> Self {
        Self {
            metric,
            cmp: Comparison::Zero,
        }
    }

    pub fn holds(&self, record: &MeasuredRecord) -> bool {
        match record.value(self.metric) {
            None => false,
            Some(v) => match self.cmp {
                Comparison::Above(t) => v > t,
                Comparison::Below(t) => v < t,
                Comparison::Zero => v == 0.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeverityPolicy {
    Fixed(Severity),
    /// `high` when `metric` exceeds `above`, else `otherwise`.
    Escalate {
        metric: Metric,
        above: f64,
        high: Severity,
        otherwise: Severity,
    },
}

impl SeverityPolicy {
    fn resolve(&self, record: &MeasuredRecord) -> Severity {
        match *self {
            Self::Fixed(s) => s,
            Self::Escalate {
                metric,
                above,
                high,
                otherwise,
            } => match record.value(metric) {
                Some(v) if v > above => high,
                _ => otherwise,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub issue_type: IssueType,
    /// All clauses must hold.
    pub conditions: Vec<Clause>,
    pub severity: SeverityPolicy,
    /// Metric reported as the issue value.
    pub value_metric: Metric,
}

impl Rule {
    fn new(issue_type: IssueType, value_metric: Metric, severity: SeverityPolicy) -> Self {
        Self {
            issue_type,
            conditions: Vec::new(),
            severity,
            value_metric,
        }
    }

    fn when(mut self, clause: Clause) -> Self {
        self.conditions.push(clause);
        self
    }

    pub fn matches(&self, record: &MeasuredRecord) -> bool {
        self.conditions.iter().all(|c| c.holds(record))
    }
}

// ---------------------------------------------------------------------------
// Rule tables
// ---------------------------------------------------------------------------

/// Ordered rule battery for one track.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    pub track: Track,
    pub rules: Vec<Rule>,
}

fn high_cpa(t: &RuleThresholds) -> Rule {
    Rule::new(
        IssueType::HighCpa,
        Metric::Cpa,
        SeverityPolicy::Escalate {
            metric: Metric::Cpa,
            above: t.critical_cpa,
            high: Severity::High,
            otherwise: Severity::Medium,
        },
    )
    .when(Clause::above(Metric::Conversions, 0.0))
    .when(Clause::above(Metric::Cpa, t.high_cpa))
}

fn low_ctr(t: &RuleThresholds) -> Rule {
    Rule::new(IssueType::LowCtr, Metric::Ctr, SeverityPolicy::Fixed(Severity::Medium))
        .when(Clause::above(Metric::Impressions, t.ctr_min_impressions))
        .when(Clause::below(Metric::Ctr, t.low_ctr))
}

fn low_conversion_rate(t: &RuleThresholds) -> Option<Rule> {
    let max_rate = t.low_conversion_rate?;
    Some(
        Rule::new(
            IssueType::LowConversionRate,
            Metric::ConversionRate,
            SeverityPolicy::Fixed(Severity::High),
        )
        .when(Clause::above(Metric::Clicks, t.conversion_rate_min_clicks))
        .when(Clause::below(Metric::ConversionRate, max_rate)),
    )
}

fn low_roas(t: &RuleThresholds) -> Rule {
    Rule::new(IssueType::LowRoas, Metric::Roas, SeverityPolicy::Fixed(Severity::Medium))
        .when(Clause::above(Metric::Roas, 0.0))
        .when(Clause::below(Metric::Roas, t.low_roas))
        .when(Clause::above(Metric::Cost, t.roas_min_cost))
}

fn high_spend_low_return(t: &RuleThresholds) -> Rule {
    Rule::new(
        IssueType::HighSpendLowReturn,
        Metric::Cost,
        SeverityPolicy::Fixed(Severity::High),
    )
    .when(Clause::above(Metric::Cost, t.high_spend))
    .when(Clause::below(Metric::Conversions, t.low_return_conversions))
}

fn no_clicks(t: &RuleThresholds) -> Option<Rule> {
    let min_impressions = t.no_clicks_min_impressions?;
    Some(
        Rule::new(IssueType::NoClicks, Metric::Impressions, SeverityPolicy::Fixed(Severity::High))
            .when(Clause::above(Metric::Impressions, min_impressions))
            .when(Clause::zero(Metric::Clicks)),
    )
}

fn no_conversions(t: &RuleThresholds) -> Option<Rule> {
    let min_clicks = t.no_conversions_min_clicks?;
    Some(
        Rule::new(
            IssueType::NoConversions,
            Metric::Clicks,
            SeverityPolicy::Fixed(Severity::High),
        )
        .when(Clause::above(Metric::Clicks, min_clicks))
        .when(Clause::zero(Metric::Conversions)),
    )
}

impl RuleTable {
    /// Campaign battery: efficiency rules first, then the spend guard.
    pub fn campaign(t: &RuleThresholds) -> Self {
        let rules = [
            Some(high_cpa(t)),
            Some(low_ctr(t)),
            low_conversion_rate(t),
            Some(low_roas(t)),
            Some(high_spend_low_return(t)),
            no_clicks(t),
            no_conversions(t),
        ];
        Self {
            track: Track::Campaign,
            rules: rules.into_iter().flatten().collect(),
        }
    }

    /// Keyword battery: dead-keyword rules first.
    pub fn keyword(t: &RuleThresholds) -> Self {
        let rules = [
            no_clicks(t),
            no_conversions(t),
            Some(low_ctr(t)),
            low_conversion_rate(t),
            Some(high_cpa(t)),
            Some(low_roas(t)),
            Some(high_spend_low_return(t)),
        ];
        Self {
            track: Track::Keyword,
            rules: rules.into_iter().flatten().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// IssueDetector
// ---------------------------------------------------------------------------

/// Evaluates every rule of a table against every record. Rules are
/// independent, so one record can raise several issues.
pub struct IssueDetector {
    table: RuleTable,
    currency: String,
}

impl IssueDetector {
    pub fn new(table: RuleTable, currency: impl Into<String>) -> Self {
        Self {
            table,
            currency: currency.into(),
        }
    }

    pub fn track(&self) -> Track {
        self.table.track
    }

    /// Issues raised by one record, in rule order.
    pub fn evaluate(&self, record: &MeasuredRecord) -> Vec<Issue> {
        self.table
            .rules
            .iter()
            .filter(|rule| rule.matches(record))
            .map(|rule| {
                let value = record.value(rule.value_metric).unwrap_or(0.0);
                Issue {
                    subject: record.subject().to_string(),
                    campaign_name: record.record.campaign_name.clone(),
                    match_type: record.record.match_type.clone(),
                    issue_type: rule.issue_type,
                    severity: rule.severity.resolve(record),
                    description: describe(rule.issue_type, value, record, &self.currency),
                    value,
                    volume: record.record.counters,
                    metrics: record.metrics,
                }
            })
            .collect()
    }

    /// Issues for all records, severity-sorted with ties in detection order.
    pub fn detect(&self, records: &[MeasuredRecord]) -> Vec<Issue> {
        let mut issues: Vec<Issue> = records.iter().flat_map(|r| self.evaluate(r)).collect();
        sort_by_severity(&mut issues);

        debug!(
            track = self.table.track.as_str(),
            records = records.len(),
            issues = issues.len(),
            "issue detection complete"
        );
        metrics::counter!("analysis.issues_detected", "track" => self.table.track.as_str())
            .increment(issues.len() as u64);
        issues
    }
}

/// Stable sort: High, Medium, Low.
pub fn sort_by_severity(issues: &mut [Issue]) {
    issues.sort_by_key(|i| i.severity.rank());
}

/// Distinct subjects that raised at least one issue.
pub fn subjects_with_issues(issues: &[Issue]) -> usize {
    let mut seen: Vec<(&str, &str)> = issues
        .iter()
        .map(|i| (i.campaign_name.as_str(), i.subject.as_str()))
        .collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

fn describe(issue_type: IssueType, value: f64, record: &MeasuredRecord, currency: &str) -> String {
    let c = record.counters();
    match issue_type {
        IssueType::HighCpa => format!("High cost per acquisition (CPA): {currency} {value:.2}"),
        IssueType::LowCtr => format!("Low click-through rate (CTR): {value:.2}%"),
        IssueType::LowConversionRate => format!("Low conversion rate: {value:.2}%"),
        IssueType::LowRoas => format!("Low return on ad spend (ROAS): {value:.2}"),
        IssueType::HighSpendLowReturn => format!(
            "High spend ({currency} {:.2}) with minimal conversions ({})",
            c.cost, c.conversions
        ),
        IssueType::NoClicks => format!("{} impressions but no clicks", c.impressions),
        IssueType::NoConversions => format!("{} clicks but no conversions", c.clicks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::measure;
    use campaign_core::types::{Counters, MatchType, RawRecord};

    fn keyword_detector() -> IssueDetector {
        IssueDetector::new(RuleTable::keyword(&RuleThresholds::keyword()), "AED")
    }

    fn campaign_detector() -> IssueDetector {
        IssueDetector::new(RuleTable::campaign(&RuleThresholds::campaign()), "AED")
    }

    fn keyword(text: &str, counters: Counters) -> MeasuredRecord {
        measure(RawRecord::keyword("Search", text, MatchType::Broad, counters))
    }

    fn kinds(issues: &[Issue]) -> Vec<IssueType> {
        issues.iter().map(|i| i.issue_type).collect()
    }

    #[test]
    fn test_low_ctr_only_for_single_click_keyword() {
        let rec = keyword("dry cleaning", Counters::new(200, 1, 5.0, 0.0));
        let issues = keyword_detector().detect(&[rec]);
        assert_eq!(kinds(&issues), vec![IssueType::LowCtr]);
        assert!((issues[0].value - 0.5).abs() < f64::EPSILON);
        assert_eq!(issues[0].severity, Severity::Medium);
    }

    #[test]
    fn test_no_clicks_is_high_with_impressions_value() {
        let rec = keyword("laundry", Counters::new(1000, 0, 0.0, 0.0));
        let issues = keyword_detector().detect(&[rec]);
        assert_eq!(issues[0].issue_type, IssueType::NoClicks);
        assert_eq!(issues[0].severity, Severity::High);
        assert!((issues[0].value - 1000.0).abs() < f64::EPSILON);
        assert_eq!(kinds(&issues), vec![IssueType::NoClicks, IssueType::LowCtr]);
    }

    #[test]
    fn test_rules_are_not_short_circuited() {
        let rec = measure(
            RawRecord::campaign("Brand", Counters::new(10_000, 80, 6000.0, 5.0).with_revenue(6000.0)),
        );
        let issues = campaign_detector().evaluate(&rec);
        assert_eq!(
            kinds(&issues),
            vec![
                IssueType::HighCpa,
                IssueType::LowCtr,
                IssueType::LowRoas,
                IssueType::HighSpendLowReturn
            ]
        );
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].description, "High cost per acquisition (CPA): AED 1200.00");
    }

    #[test]
    fn test_high_cpa_threshold_differs_per_track() {
        let counters = Counters::new(50, 20, 400.0, 1.0);
        let kw = keyword_detector().evaluate(&keyword("sofa", counters));
        let camp = campaign_detector().evaluate(&measure(RawRecord::campaign("Sofa", counters)));
        assert!(kinds(&kw).contains(&IssueType::HighCpa));
        assert!(!kinds(&camp).contains(&IssueType::HighCpa));
        assert_eq!(kw[0].severity, Severity::Medium);
    }

    #[test]
    fn test_undefined_cpa_never_matches() {
        let rec = measure(RawRecord::campaign("X", Counters::new(100, 60, 900.0, 0.0)));
        let issues = campaign_detector().evaluate(&rec);
        assert!(!kinds(&issues).contains(&IssueType::HighCpa));
        assert!(kinds(&issues).contains(&IssueType::LowConversionRate));
    }

    #[test]
    fn test_keyword_track_has_no_low_conversion_rate_rule() {
        let table = RuleTable::keyword(&RuleThresholds::keyword());
        assert!(table
            .rules
            .iter()
            .all(|r| r.issue_type != IssueType::LowConversionRate));
        let campaign = RuleTable::campaign(&RuleThresholds::campaign());
        assert!(campaign
            .rules
            .iter()
            .all(|r| r.issue_type != IssueType::NoClicks && r.issue_type != IssueType::NoConversions));
    }

    #[test]
    fn test_severity_sort_is_stable() {
        let detector = keyword_detector();
        let medium = detector.evaluate(&keyword("a", Counters::new(200, 1, 5.0, 0.0)));
        let high_a = detector.evaluate(&keyword("b", Counters::new(0, 20, 50.0, 0.0)));
        let high_b = detector.evaluate(&keyword("c", Counters::new(0, 30, 60.0, 0.0)));
        let mut low = medium[0].clone();
        low.subject = "d".to_string();
        low.severity = Severity::Low;

        let mut issues = vec![medium[0].clone(), high_a[0].clone(), low, high_b[0].clone()];
        sort_by_severity(&mut issues);
        let order: Vec<(&str, Severity)> =
            issues.iter().map(|i| (i.subject.as_str(), i.severity)).collect();
        assert_eq!(
            order,
            vec![
                ("b", Severity::High),
                ("c", Severity::High),
                ("a", Severity::Medium),
                ("d", Severity::Low)
            ]
        );
    }

    #[test]
    fn test_subjects_with_issues_counts_distinct() {
        let rec = keyword("laundry", Counters::new(1000, 0, 0.0, 0.0));
        let issues = keyword_detector().detect(&[rec]);
        assert_eq!(issues.len(), 2);
        assert_eq!(subjects_with_issues(&issues), 1);
    }
}
