//! Canonical schema and alias resolution for export column names.

use serde::Serialize;
use std::collections::BTreeMap;

/// Fields every downstream analyzer reads. The first nine names are a
/// stable contract for anything that consumes normalized data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalColumn {
    CampaignName,
    AdGroupName,
    Keyword,
    MatchType,
    Impressions,
    Clicks,
    Cost,
    Conversions,
    Revenue,
    CampaignType,
    CampaignStatus,
    Platform,
    DeviceOs,
    Date,
}

impl CanonicalColumn {
    pub const ALL: [CanonicalColumn; 14] = [
        Self::CampaignName,
        Self::AdGroupName,
        Self::Keyword,
        Self::MatchType,
        Self::Impressions,
        Self::Clicks,
        Self::Cost,
        Self::Conversions,
        Self::Revenue,
        Self::CampaignType,
        Self::CampaignStatus,
        Self::Platform,
        Self::DeviceOs,
        Self::Date,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CampaignName => "campaign_name",
            Self::AdGroupName => "ad_group_name",
            Self::Keyword => "keyword",
            Self::MatchType => "match_type",
            Self::Impressions => "impressions",
            Self::Clicks => "clicks",
            Self::Cost => "cost",
            Self::Conversions => "conversions",
            Self::Revenue => "revenue",
            Self::CampaignType => "campaign_type",
            Self::CampaignStatus => "campaign_status",
            Self::Platform => "platform",
            Self::DeviceOs => "device_os",
            Self::Date => "date",
        }
    }

    /// Known source headers in priority order; the first present wins.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::CampaignName => &["campaign_name", "Campaign", "campaign", "Campaign name"],
            Self::AdGroupName => &["ad_group_name", "Ad group", "Ad group name", "ad_group"],
            Self::Keyword => &["keyword", "Keyword", "Search keyword", "Keyword text"],
            Self::MatchType => &["match_type", "Match type", "Search keyword match type"],
            Self::Impressions => &["impressions", "Impr.", "Impressions", "Impr"],
            Self::Clicks => &["clicks", "Interactions", "Clicks", "Clks"],
            Self::Cost => &["cost", "Cost", "Spend", "Ad spend"],
            Self::Conversions => &["conversions", "Conversions", "Conv.", "Conv"],
            Self::Revenue => &[
                "revenue",
                "Conv. value",
                "Conversion value",
                "conv_value",
                "Revenue",
            ],
            Self::CampaignType => &["campaign_type", "Campaign type", "Type"],
            Self::CampaignStatus => &["campaign_status", "Campaign status", "Status"],
            Self::Platform => &["platform", "Platform", "Network"],
            Self::DeviceOs => &["device_os", "Device OS", "Operating system", "OS"],
            Self::Date => &["date", "Date", "Day"],
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Impressions | Self::Clicks | Self::Cost | Self::Conversions | Self::Revenue
        )
    }
}

/// Shape of an upload, which decides the required columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Campaign,
    Keyword,
    Monthly,
}

impl ReportKind {
    pub fn required(self) -> &'static [CanonicalColumn] {
        use CanonicalColumn::*;
        match self {
            Self::Campaign | Self::Monthly => {
                &[CampaignName, Impressions, Clicks, Cost, Conversions]
            }
            Self::Keyword => &[Keyword, MatchType, Impressions, Clicks, Cost, Conversions],
        }
    }

    /// Column whose emptiness marks a row as non-data.
    pub fn identifier(self) -> CanonicalColumn {
        match self {
            Self::Keyword => CanonicalColumn::Keyword,
            Self::Campaign | Self::Monthly => CanonicalColumn::CampaignName,
        }
    }
}

/// Result of matching a header row against the alias table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    resolved: BTreeMap<CanonicalColumn, (usize, String)>,
}

impl ColumnMapping {
    pub fn resolve(headers: &[String]) -> Self {
        let mut resolved = BTreeMap::new();
        for column in CanonicalColumn::ALL {
            let hit = column.aliases().iter().find_map(|alias| {
                headers
                    .iter()
                    .position(|h| h == alias)
                    .map(|idx| (idx, alias.to_string()))
            });
            if let Some(hit) = hit {
                resolved.insert(column, hit);
            }
        }
        Self { resolved }
    }

    pub fn index(&self, column: CanonicalColumn) -> Option<usize> {
        self.resolved.get(&column).map(|(idx, _)| *idx)
    }

    pub fn missing(&self, kind: ReportKind) -> Vec<CanonicalColumn> {
        kind.required()
            .iter()
            .copied()
            .filter(|c| !self.resolved.contains_key(c))
            .collect()
    }

    /// Canonical name to source header, for reporting.
    pub fn source_names(&self) -> BTreeMap<String, String> {
        self.resolved
            .iter()
            .map(|(c, (_, source))| (c.name().to_string(), source.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_alias_wins() {
        let mapping = ColumnMapping::resolve(&headers(&["Clicks", "Interactions", "Campaign"]));
        assert_eq!(mapping.index(CanonicalColumn::Clicks), Some(1));
        assert_eq!(mapping.index(CanonicalColumn::CampaignName), Some(2));
        assert_eq!(mapping.source_names()["clicks"], "Interactions");
    }

    #[test]
    fn test_impression_aliases_resolve_to_same_column() {
        let a = ColumnMapping::resolve(&headers(&["Impr."]));
        let b = ColumnMapping::resolve(&headers(&["Impressions"]));
        assert_eq!(a.index(CanonicalColumn::Impressions), Some(0));
        assert_eq!(b.index(CanonicalColumn::Impressions), Some(0));
    }

    #[test]
    fn test_missing_required_by_kind() {
        let mapping = ColumnMapping::resolve(&headers(&["Keyword", "Impr.", "Clicks", "Cost"]));
        let missing = mapping.missing(ReportKind::Keyword);
        assert_eq!(missing, vec![CanonicalColumn::MatchType, CanonicalColumn::Conversions]);
        let campaign_missing = mapping.missing(ReportKind::Campaign);
        assert!(campaign_missing.contains(&CanonicalColumn::CampaignName));
    }

    #[test]
    fn test_canonical_names_are_stable() {
        let names: Vec<&str> = CanonicalColumn::ALL[..9].iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "campaign_name",
                "ad_group_name",
                "keyword",
                "match_type",
                "impressions",
                "clicks",
                "cost",
                "conversions",
                "revenue"
            ]
        );
    }
}
