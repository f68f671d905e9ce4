//! Multi-month uploads: one export per month, named like `Mar 2025.csv`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use campaign_core::types::MonthTag;
use campaign_core::{CampaignError, CampaignResult};
use chrono::Month;
use regex::Regex;
use tracing::{info, warn};

use crate::columns::ReportKind;
use crate::normalizer::{ColumnNormalizer, NormalizedDataset};
use crate::quality::{DataQualityReport, QualityCheck, QualityFinding};

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyFile {
    pub path: PathBuf,
    pub tag: MonthTag,
}

pub struct MonthlyLoader<'a> {
    normalizer: ColumnNormalizer<'a>,
    file_pattern: Regex,
}

impl<'a> MonthlyLoader<'a> {
    pub fn new(normalizer: ColumnNormalizer<'a>) -> CampaignResult<Self> {
        let file_pattern = Regex::new(
            r"(?i)^(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\s+(\d{4})\.csv$",
        )
        .map_err(|e| CampaignError::Config(format!("month file pattern: {e}")))?;
        Ok(Self {
            normalizer,
            file_pattern,
        })
    }

    /// Month tag for a file name such as `mar 2025.csv`.
    pub fn parse_file_name(&self, file_name: &str) -> Option<MonthTag> {
        let caps = self.file_pattern.captures(file_name)?;
        month_tag(caps.get(1)?.as_str(), caps.get(2)?.as_str())
    }

    /// Monthly exports in `dir`, oldest first.
    pub fn discover(&self, dir: &Path) -> CampaignResult<Vec<MonthlyFile>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(tag) = self.parse_file_name(name) {
                files.push(MonthlyFile { path, tag });
            }
        }
        files.sort_by_key(|f| f.tag.index);
        Ok(files)
    }

    /// Load every monthly export in `dir` into one dataset.
    pub fn load_directory(&self, dir: &Path) -> CampaignResult<NormalizedDataset> {
        let files = self.discover(dir)?;
        if files.is_empty() {
            return Err(CampaignError::EmptyDataset(format!(
                "no monthly exports named like 'Mar 2025.csv' in {}",
                dir.display()
            )));
        }
        let mut months = Vec::with_capacity(files.len());
        for file in files {
            let text = std::fs::read_to_string(&file.path)?;
            months.push((file.tag, text));
        }
        self.load_months(months)
    }

    /// Normalize already-read month exports and concatenate them in month
    /// order. A month that fails to normalize is skipped with a warning.
    pub fn load_months(&self, mut months: Vec<(MonthTag, String)>) -> CampaignResult<NormalizedDataset> {
        months.sort_by_key(|(tag, _)| tag.index);

        let mut records = Vec::new();
        let mut quality = DataQualityReport::default();
        let mut column_mapping = Default::default();
        let mut header_rows_skipped = 0;
        let mut rows_dropped = 0;
        let mut loaded = 0usize;
        let mut last_error = None;

        for (tag, text) in months {
            match self.normalizer.normalize_text(&text, ReportKind::Monthly) {
                Ok(dataset) => {
                    loaded += 1;
                    info!(month = %tag.label, records = dataset.records.len(), "loaded month");
                    rows_dropped += dataset.rows_dropped;
                    header_rows_skipped = dataset.header_rows_skipped;
                    column_mapping = dataset.column_mapping;
                    quality.absorb(dataset.quality, &tag.label);
                    records.extend(dataset.records.into_iter().map(|mut r| {
                        r.month = Some(tag.clone());
                        r
                    }));
                }
                Err(e) => {
                    warn!(month = %tag.label, error = %e, "skipping month");
                    quality.warn(QualityFinding {
                        check: QualityCheck::SkippedFile,
                        column: None,
                        count: 1,
                        message: format!("[{}] skipped: {e}", tag.label),
                    });
                    last_error = Some(e);
                }
            }
        }

        if loaded == 0 {
            return Err(last_error.unwrap_or_else(|| {
                CampaignError::EmptyDataset("no monthly exports supplied".to_string())
            }));
        }

        Ok(NormalizedDataset {
            kind: ReportKind::Monthly,
            records,
            column_mapping,
            header_rows_skipped,
            rows_dropped,
            quality,
        })
    }
}

/// Build a tag from a month name (`Mar`, `march`) and a year.
pub fn month_tag(month: &str, year: &str) -> Option<MonthTag> {
    let month = Month::from_str(month).ok()?;
    let year: i32 = year.parse().ok()?;
    let month0 = month.number_from_month() as i32 - 1;
    Some(MonthTag {
        label: format!("{} {year}", month_abbrev(month)),
        index: year * 12 + month0,
    })
}

/// Parse a label such as `Mar 2025`.
pub fn parse_month_label(label: &str) -> Option<MonthTag> {
    let mut parts = label.split_whitespace();
    let month = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    month_tag(month, year)
}

fn month_abbrev(month: Month) -> &'static str {
    let name = month.name();
    &name[..3]
}
