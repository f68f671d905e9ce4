//! Column Normalizer: raw export table in, canonical records out.

use std::collections::{BTreeMap, BTreeSet};

use campaign_core::config::IngestConfig;
use campaign_core::types::{Counters, MatchType, RawRecord};
use campaign_core::{CampaignError, CampaignResult};
use serde::Serialize;
use tracing::{debug, info};

use crate::clean::{clean_keyword, clean_text, is_blank, is_totals_marker, parse_number};
use crate::columns::{CanonicalColumn, ColumnMapping, ReportKind};
use crate::quality::{self, CellTally, DataQualityReport};
use crate::table::{cell, RawTable};

/// Canonical records plus everything learned while producing them.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedDataset {
    pub kind: ReportKind,
    pub records: Vec<RawRecord>,
    /// Canonical column name to the export header it was read from.
    pub column_mapping: BTreeMap<String, String>,
    pub header_rows_skipped: usize,
    /// Totals rows and rows without an identifier.
    pub rows_dropped: usize,
    pub quality: DataQualityReport,
}

/// Overview of a dataset, independent of any analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_rows: usize,
    pub campaigns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_groups: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub match_types: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub campaign_types: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub months: Vec<String>,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_cost: f64,
    pub total_conversions: f64,
    pub total_revenue: f64,
}

impl NormalizedDataset {
    pub fn summary(&self) -> DatasetSummary {
        let totals = Counters::total(self.records.iter().map(|r| &r.counters));
        let campaigns: BTreeSet<&str> =
            self.records.iter().map(|r| r.campaign_name.as_str()).collect();
        let ad_groups: BTreeSet<&str> = self
            .records
            .iter()
            .filter_map(|r| r.ad_group_name.as_deref())
            .collect();

        let mut match_types: Vec<String> = Vec::new();
        let mut campaign_types: Vec<String> = Vec::new();
        let mut months: Vec<(i32, String)> = Vec::new();
        for r in &self.records {
            if let Some(m) = &r.match_type {
                push_unique(&mut match_types, m.as_str());
            }
            if let Some(t) = &r.campaign_type {
                push_unique(&mut campaign_types, t);
            }
            if let Some(tag) = &r.month {
                if !months.iter().any(|(idx, _)| *idx == tag.index) {
                    months.push((tag.index, tag.label.clone()));
                }
            }
        }
        months.sort_by_key(|(idx, _)| *idx);

        DatasetSummary {
            total_rows: self.records.len(),
            campaigns: campaigns.len(),
            ad_groups: (!ad_groups.is_empty()).then_some(ad_groups.len()),
            match_types,
            campaign_types,
            months: months.into_iter().map(|(_, label)| label).collect(),
            total_impressions: totals.impressions,
            total_clicks: totals.clicks,
            total_cost: totals.cost,
            total_conversions: totals.conversions,
            total_revenue: totals.revenue_or_zero(),
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

pub struct ColumnNormalizer<'a> {
    config: &'a IngestConfig,
}

impl<'a> ColumnNormalizer<'a> {
    pub fn new(config: &'a IngestConfig) -> Self {
        Self { config }
    }

    /// Parse CSV text, retrying across the configured header-skip counts
    /// until the required columns for `kind` are found.
    pub fn normalize_text(&self, text: &str, kind: ReportKind) -> CampaignResult<NormalizedDataset> {
        let mut closest: Option<Vec<CanonicalColumn>> = None;
        let mut last_parse_error = None;

        for &skip in &self.config.header_skip_candidates {
            let table = match RawTable::parse(text, skip) {
                Ok(table) => table,
                Err(e) => {
                    debug!(skip, error = %e, "header candidate unparseable");
                    last_parse_error = Some(e);
                    continue;
                }
            };
            let missing = ColumnMapping::resolve(&table.headers).missing(kind);
            if missing.is_empty() {
                return self.normalize_table(&table, kind);
            }
            debug!(skip, missing = missing.len(), "header candidate rejected");
            if closest.as_ref().map_or(true, |c| missing.len() < c.len()) {
                closest = Some(missing);
            }
        }

        match (closest, last_parse_error) {
            (Some(missing), _) => Err(CampaignError::MissingRequiredColumns(
                missing.iter().map(|c| c.name().to_string()).collect(),
            )),
            (None, Some(e)) => Err(e),
            (None, None) => Err(CampaignError::UnparseableFile(
                "no header skip candidates configured".to_string(),
            )),
        }
    }

    /// Normalize an already-split table without any header retry.
    pub fn normalize_table(
        &self,
        table: &RawTable,
        kind: ReportKind,
    ) -> CampaignResult<NormalizedDataset> {
        let mapping = ColumnMapping::resolve(&table.headers);
        let missing = mapping.missing(kind);
        if !missing.is_empty() {
            return Err(CampaignError::MissingRequiredColumns(
                missing.iter().map(|c| c.name().to_string()).collect(),
            ));
        }

        let mut tally = CellTally::default();
        let mut records = Vec::with_capacity(table.len());
        let mut dropped = 0usize;

        for row in &table.rows {
            if self.is_non_data_row(row, &mapping, kind) {
                dropped += 1;
                continue;
            }
            records.push(self.build_record(row, &mapping, kind, &mut tally));
        }

        let quality = quality::assess(&records, &tally, kind, self.config.low_volume_impressions);
        info!(
            kind = ?kind,
            records = records.len(),
            dropped,
            skipped_header_rows = table.skipped_rows,
            valid = quality.is_valid,
            "normalized export"
        );

        Ok(NormalizedDataset {
            kind,
            records,
            column_mapping: mapping.source_names(),
            header_rows_skipped: table.skipped_rows,
            rows_dropped: dropped,
            quality,
        })
    }

    fn is_non_data_row(&self, row: &[String], mapping: &ColumnMapping, kind: ReportKind) -> bool {
        let markers = [
            CanonicalColumn::CampaignStatus,
            CanonicalColumn::MatchType,
            CanonicalColumn::CampaignName,
            CanonicalColumn::Keyword,
        ];
        let is_total = markers
            .iter()
            .filter_map(|c| mapping.index(*c))
            .any(|idx| is_totals_marker(cell(row, idx)));
        if is_total {
            return true;
        }
        match mapping.index(kind.identifier()) {
            Some(idx) => is_blank(&clean_text(cell(row, idx))),
            None => false,
        }
    }

    fn build_record(
        &self,
        row: &[String],
        mapping: &ColumnMapping,
        kind: ReportKind,
        tally: &mut CellTally,
    ) -> RawRecord {
        let text = |column: CanonicalColumn| -> Option<String> {
            mapping
                .index(column)
                .map(|idx| clean_text(cell(row, idx)))
                .filter(|v| !is_blank(v))
        };

        let mut number = |column: CanonicalColumn| -> Option<f64> {
            let idx = mapping.index(column)?;
            let raw = cell(row, idx);
            if is_blank(raw) {
                if kind.required().contains(&column) {
                    tally.missing(column);
                }
                return Some(0.0);
            }
            let value = parse_number(raw).unwrap_or(0.0);
            if value < 0.0 {
                tally.negative(column);
                return Some(0.0);
            }
            Some(value)
        };

        let impressions = number(CanonicalColumn::Impressions).unwrap_or(0.0);
        let clicks = number(CanonicalColumn::Clicks).unwrap_or(0.0);
        let cost = number(CanonicalColumn::Cost).unwrap_or(0.0);
        let conversions = number(CanonicalColumn::Conversions).unwrap_or(0.0);
        let revenue = number(CanonicalColumn::Revenue);

        let (campaign_name, ad_group_name) = match kind {
            ReportKind::Keyword => (
                text(CanonicalColumn::CampaignName)
                    .unwrap_or_else(|| self.config.default_campaign_name.clone()),
                Some(
                    text(CanonicalColumn::AdGroupName)
                        .unwrap_or_else(|| self.config.default_ad_group_name.clone()),
                ),
            ),
            ReportKind::Campaign | ReportKind::Monthly => (
                text(CanonicalColumn::CampaignName).unwrap_or_default(),
                text(CanonicalColumn::AdGroupName),
            ),
        };

        let keyword = mapping
            .index(CanonicalColumn::Keyword)
            .map(|idx| clean_keyword(cell(row, idx)))
            .filter(|k| !k.is_empty());
        let match_type = text(CanonicalColumn::MatchType).map(|m| MatchType::from_label(&m));

        RawRecord {
            campaign_name,
            ad_group_name,
            keyword,
            match_type,
            campaign_type: text(CanonicalColumn::CampaignType),
            campaign_status: text(CanonicalColumn::CampaignStatus),
            platform: text(CanonicalColumn::Platform),
            device_os: text(CanonicalColumn::DeviceOs),
            date: text(CanonicalColumn::Date),
            month: None,
            counters: Counters {
                impressions: impressions.round() as u64,
                clicks: clicks.round() as u64,
                cost,
                conversions,
                revenue,
            },
        }
    }
}
