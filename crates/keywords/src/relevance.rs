//! Website relevance: how well each keyword maps onto a service the
//! advertiser actually offers.

use campaign_core::config::{RelevanceConfig, ServiceDefinition};
use campaign_core::types::{round2, MeasuredRecord};
use serde::Serialize;
use tracing::debug;

pub const UNALIGNED_BUCKET: &str = "Unaligned Keywords";

const EXACT_STRENGTH: f64 = 1.0;
const PARTIAL_STRENGTH: f64 = 0.8;
const RELATED_STRENGTH: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlignmentStatus {
    Aligned,
    Misaligned,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alignment {
    pub keyword: String,
    pub campaign_name: String,
    pub aligned_service: Option<String>,
    pub alignment_strength: f64,
    pub status: AlignmentStatus,
    pub issue: Option<String>,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCoverage {
    pub service: String,
    pub keywords: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoverageIssue {
    NoKeywords,
    LowCoverage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncoveredService {
    pub service: String,
    pub url: String,
    pub issue: CoverageIssue,
    pub description: String,
    pub suggested_keywords: Vec<String>,
    pub recommended_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandingPageRecommendation {
    pub keyword: String,
    pub campaign_name: String,
    pub cost: f64,
    pub recommendation: String,
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelevanceReport {
    pub total_keywords_reviewed: usize,
    pub aligned_keywords: usize,
    pub misaligned_keywords: usize,
    pub service_coverage: Vec<ServiceCoverage>,
    pub uncovered_services: Vec<UncoveredService>,
    pub weak_alignments: Vec<Alignment>,
    pub landing_page_recommendations: Vec<LandingPageRecommendation>,
    pub alignment_details: Vec<Alignment>,
}

pub struct RelevanceChecker {
    config: RelevanceConfig,
    currency: String,
}

impl RelevanceChecker {
    pub fn new(config: &RelevanceConfig, currency: impl Into<String>) -> Self {
        Self {
            config: config.clone(),
            currency: currency.into(),
        }
    }

    pub fn report(&self, rows: &[MeasuredRecord]) -> RelevanceReport {
        let alignments = self.check(rows);
        let aligned = alignments
            .iter()
            .filter(|a| a.status == AlignmentStatus::Aligned)
            .count();
        debug!(
            keywords = alignments.len(),
            aligned,
            "keyword alignment checked"
        );
        RelevanceReport {
            total_keywords_reviewed: alignments.len(),
            aligned_keywords: aligned,
            misaligned_keywords: alignments.len() - aligned,
            service_coverage: self.coverage(&alignments),
            uncovered_services: self.uncovered_services(&alignments),
            weak_alignments: self.weak_alignments(&alignments),
            landing_page_recommendations: self.landing_page_recommendations(&alignments),
            alignment_details: alignments,
        }
    }

    pub fn check(&self, rows: &[MeasuredRecord]) -> Vec<Alignment> {
        rows.iter()
            .map(|r| {
                let keyword = r.subject();
                let lowered = keyword.to_lowercase();
                let (aligned_service, strength) = match self.find_service(&lowered) {
                    Some(service) => (Some(service.name.clone()), alignment_strength(&lowered, service)),
                    None => (None, 0.0),
                };
                let status = if aligned_service.is_some() {
                    AlignmentStatus::Aligned
                } else {
                    AlignmentStatus::Misaligned
                };
                Alignment {
                    keyword: keyword.to_string(),
                    campaign_name: r.record.campaign_name.clone(),
                    aligned_service,
                    alignment_strength: strength,
                    status,
                    issue: (status == AlignmentStatus::Misaligned)
                        .then(|| "Keyword not clearly mapped to service offerings".to_string()),
                    cost: round2(r.counters().cost),
                }
            })
            .collect()
    }

    /// First service, in configured order, whose primary or related terms
    /// overlap the keyword.
    fn find_service(&self, keyword: &str) -> Option<&ServiceDefinition> {
        self.config.services.iter().find(|s| {
            s.keywords.iter().any(|t| overlaps(keyword, t))
                || s.related_keywords.iter().any(|t| overlaps(keyword, t))
        })
    }

    /// Keyword count per service in configured order, plus the unaligned
    /// bucket.
    pub fn coverage(&self, alignments: &[Alignment]) -> Vec<ServiceCoverage> {
        let mut out: Vec<ServiceCoverage> = self
            .config
            .services
            .iter()
            .map(|s| ServiceCoverage {
                service: s.name.clone(),
                keywords: alignments
                    .iter()
                    .filter(|a| a.aligned_service.as_deref() == Some(s.name.as_str()))
                    .count(),
            })
            .collect();
        out.push(ServiceCoverage {
            service: UNALIGNED_BUCKET.to_string(),
            keywords: alignments
                .iter()
                .filter(|a| a.status == AlignmentStatus::Misaligned)
                .count(),
        });
        out
    }

    pub fn uncovered_services(&self, alignments: &[Alignment]) -> Vec<UncoveredService> {
        let min = self.config.min_keywords_per_service;
        let coverage = self.coverage(alignments);
        self.config
            .services
            .iter()
            .zip(coverage)
            .filter_map(|(service, cov)| {
                let name = &service.name;
                if cov.keywords == 0 {
                    Some(UncoveredService {
                        service: name.clone(),
                        url: service.url.clone(),
                        issue: CoverageIssue::NoKeywords,
                        description: format!("Service '{name}' has no keywords in portfolio"),
                        suggested_keywords: service.keywords.clone(),
                        recommended_action: format!("Add {} primary keywords", service.keywords.len()),
                    })
                } else if cov.keywords < min {
                    Some(UncoveredService {
                        service: name.clone(),
                        url: service.url.clone(),
                        issue: CoverageIssue::LowCoverage,
                        description: format!("Service '{name}' has only {} keywords", cov.keywords),
                        suggested_keywords: service.related_keywords.clone(),
                        recommended_action: format!("Add {} related keywords", min - cov.keywords),
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Aligned keywords whose strength is below the configured threshold.
    pub fn weak_alignments(&self, alignments: &[Alignment]) -> Vec<Alignment> {
        alignments
            .iter()
            .filter(|a| {
                a.alignment_strength > 0.0
                    && a.alignment_strength < self.config.weak_alignment_threshold
            })
            .cloned()
            .collect()
    }

    /// Misaligned keywords with significant spend.
    pub fn landing_page_recommendations(&self, alignments: &[Alignment]) -> Vec<LandingPageRecommendation> {
        alignments
            .iter()
            .filter(|a| {
                a.status == AlignmentStatus::Misaligned
                    && a.cost > self.config.misaligned_spend_threshold
            })
            .map(|a| LandingPageRecommendation {
                keyword: a.keyword.clone(),
                campaign_name: a.campaign_name.clone(),
                cost: a.cost,
                recommendation: format!(
                    "Keyword '{}' ({} {:.0} spent) doesn't clearly map to any service. Review landing page or pause keyword.",
                    a.keyword, self.currency, a.cost
                ),
                action: "REVIEW_LANDING_PAGE".to_string(),
            })
            .collect()
    }
}

/// Substring containment in either direction, case-insensitive.
fn overlaps(keyword: &str, term: &str) -> bool {
    let term = term.to_lowercase();
    !term.is_empty() && (keyword.contains(&term) || term.contains(keyword))
}

fn alignment_strength(keyword: &str, service: &ServiceDefinition) -> f64 {
    if service.keywords.iter().any(|t| t.to_lowercase() == keyword) {
        EXACT_STRENGTH
    } else if service.keywords.iter().any(|t| overlaps(keyword, t)) {
        PARTIAL_STRENGTH
    } else if service.related_keywords.iter().any(|t| overlaps(keyword, t)) {
        RELATED_STRENGTH
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_analytics::measure::measure;
    use campaign_core::types::{Counters, MatchType, RawRecord};

    fn kw(campaign: &str, text: &str, cost: f64) -> MeasuredRecord {
        measure(RawRecord::keyword(
            campaign,
            text,
            MatchType::Exact,
            Counters::new(100, 5, cost, 0.0),
        ))
    }

    fn checker() -> RelevanceChecker {
        RelevanceChecker::new(&RelevanceConfig::default(), "AED")
    }

    #[test]
    fn test_alignment_strength_tiers() {
        let rows = [
            kw("Search", "dry cleaning", 10.0),
            kw("Search", "dry cleaning dubai", 10.0),
            kw("Search", "garment care", 10.0),
            kw("Search", "car wash", 10.0),
            kw("Search", "pet grooming", 10.0),
        ];
        let a = checker().check(&rows);
        assert!((a[0].alignment_strength - 1.0).abs() < f64::EPSILON);
        assert!((a[1].alignment_strength - 0.8).abs() < f64::EPSILON);
        assert!((a[2].alignment_strength - 0.6).abs() < f64::EPSILON);
        assert_eq!(a[2].aligned_service.as_deref(), Some("Dry Cleaning Services"));
        assert_eq!(a[3].aligned_service.as_deref(), Some("Laundry Services"));
        assert_eq!(a[4].status, AlignmentStatus::Misaligned);
        assert!((a[4].alignment_strength).abs() < f64::EPSILON);
        assert!(a[4].issue.is_some());
    }

    #[test]
    fn test_alignment_keeps_campaign_name() {
        let a = checker().check(&[kw("Brand Search", "pet grooming", 10.0)]);
        assert_eq!(a[0].campaign_name, "Brand Search");
    }

    #[test]
    fn test_coverage_and_uncovered_services() {
        let rows = [
            kw("S", "sofa cleaning", 1.0),
            kw("S", "couch cleaning", 1.0),
            kw("S", "pet grooming", 1.0),
        ];
        let c = checker();
        let alignments = c.check(&rows);
        let coverage = c.coverage(&alignments);
        assert_eq!(coverage.len(), 7);
        let last = coverage.last().unwrap();
        assert_eq!(last.service, UNALIGNED_BUCKET);
        assert_eq!(last.keywords, 1);

        let uncovered = c.uncovered_services(&alignments);
        let sofa = uncovered
            .iter()
            .find(|u| u.service == "Sofa & Upholstery Cleaning")
            .unwrap();
        assert_eq!(sofa.issue, CoverageIssue::LowCoverage);
        assert_eq!(sofa.recommended_action, "Add 1 related keywords");
        assert_eq!(
            uncovered.iter().filter(|u| u.issue == CoverageIssue::NoKeywords).count(),
            5
        );
    }

    #[test]
    fn test_report_weak_and_landing_pages() {
        let rows = [
            kw("S", "garment care", 10.0),
            kw("S", "pet grooming", 250.0),
            kw("S", "dog walking", 50.0),
        ];
        let report = checker().report(&rows);
        assert_eq!(report.total_keywords_reviewed, 3);
        assert_eq!(report.aligned_keywords, 1);
        assert_eq!(report.misaligned_keywords, 2);
        assert_eq!(report.weak_alignments.len(), 1);
        assert_eq!(report.landing_page_recommendations.len(), 1);
        assert_eq!(report.landing_page_recommendations[0].keyword, "pet grooming");
        assert_eq!(report.landing_page_recommendations[0].action, "REVIEW_LANDING_PAGE");
    }
}
