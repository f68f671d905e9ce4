//! In-memory CSV table. No typing happens here; every cell stays a string.

use campaign_core::{CampaignError, CampaignResult};
use csv::ReaderBuilder;

/// Header row plus data rows of an export, after skipping any title rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Number of leading rows dropped before the header.
    pub skipped_rows: usize,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers,
            rows,
            skipped_rows: 0,
        }
    }

    /// Parse CSV text, treating the record after `skip_rows` leading
    /// records as the header.
    pub fn parse(text: &str, skip_rows: usize) -> CampaignResult<Self> {
        let text = text.trim_start_matches('\u{feff}');
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut records = rdr.records().skip(skip_rows);
        let headers = match records.next() {
            Some(header) => header?
                .iter()
                .map(|h| h.trim().to_string())
                .collect::<Vec<_>>(),
            None => {
                return Err(CampaignError::UnparseableFile(format!(
                    "no header row after skipping {skip_rows} rows"
                )))
            }
        };
        if headers.iter().all(|h| h.is_empty()) {
            return Err(CampaignError::UnparseableFile(format!(
                "empty header row after skipping {skip_rows} rows"
            )));
        }

        let mut rows = Vec::new();
        for record in records {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        Ok(Self {
            headers,
            rows,
            skipped_rows: skip_rows,
        })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Cell at `idx`, or an empty string for short rows.
pub fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_csv() {
        let table = RawTable::parse("keyword,clicks\nlaundry,10\nsofa,3\n", 0).unwrap();
        assert_eq!(table.headers, vec!["keyword", "clicks"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_index("clicks"), Some(1));
    }

    #[test]
    fn test_parse_skips_title_rows() {
        let text = "Keyword report\n\"1 March 2025 - 31 March 2025\"\nKeyword,Clicks\nlaundry,10\n";
        let table = RawTable::parse(text, 2).unwrap();
        assert_eq!(table.headers, vec!["Keyword", "Clicks"]);
        assert_eq!(table.rows, vec![vec!["laundry".to_string(), "10".to_string()]]);
        assert_eq!(table.skipped_rows, 2);
    }

    #[test]
    fn test_parse_strips_bom_and_blank_rows() {
        let table = RawTable::parse("\u{feff}Campaign,Cost\nA,1\n,\n", 0).unwrap();
        assert_eq!(table.headers[0], "Campaign");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_parse_too_few_rows_is_unparseable() {
        let err = RawTable::parse("only one line\n", 2).unwrap_err();
        assert!(matches!(err, CampaignError::UnparseableFile(_)));
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let row = vec!["a".to_string()];
        assert_eq!(cell(&row, 0), "a");
        assert_eq!(cell(&row, 3), "");
    }
}
