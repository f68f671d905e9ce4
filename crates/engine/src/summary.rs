use serde::Serialize;

/// Headline counts every track reports. A record is the track's subject:
/// a campaign for the campaign and monthly tracks, a keyword row for the
/// keyword track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub total_records: usize,
    pub records_with_issues: usize,
    pub opportunities: usize,
    pub total_recommendations: usize,
}
