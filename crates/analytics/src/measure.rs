//! Metrics calculator. Rates are always recomputed from summed counters,
//! never averaged, and every division has a fixed zero-denominator value.

use std::collections::BTreeMap;

use campaign_core::types::{Counters, MeasuredRecord, Metrics, RawRecord};

/// Derive rate metrics from raw counters.
pub fn derive(c: &Counters) -> Metrics {
    let impressions = c.impressions as f64;
    let clicks = c.clicks as f64;
    let revenue = c.revenue_or_zero();

    Metrics {
        ctr: if impressions > 0.0 {
            clicks / impressions * 100.0
        } else {
            0.0
        },
        conversion_rate: if clicks > 0.0 {
            c.conversions / clicks * 100.0
        } else {
            0.0
        },
        cpc: if clicks > 0.0 { c.cost / clicks } else { 0.0 },
        cpa: if c.conversions > 0.0 {
            Some(c.cost / c.conversions)
        } else {
            None
        },
        roas: if c.cost > 0.0 && revenue > 0.0 {
            revenue / c.cost
        } else {
            0.0
        },
        spend_share: None,
    }
}

pub fn measure(record: RawRecord) -> MeasuredRecord {
    let metrics = derive(&record.counters);
    MeasuredRecord { record, metrics }
}

/// Metrics per row, without any grouping.
pub fn measure_rows(records: &[RawRecord]) -> Vec<MeasuredRecord> {
    records.iter().cloned().map(measure).collect()
}

/// Sum rows sharing a key into one record per key, ordered by key. The
/// first row of each group supplies the identifying fields.
pub fn aggregate<K, F>(records: &[RawRecord], key: F) -> Vec<MeasuredRecord>
where
    K: Ord,
    F: Fn(&RawRecord) -> K,
{
    let mut groups: BTreeMap<K, RawRecord> = BTreeMap::new();
    for r in records {
        groups
            .entry(key(r))
            .and_modify(|acc| {
                acc.counters.accumulate(&r.counters);
                if acc.campaign_type.is_none() {
                    acc.campaign_type = r.campaign_type.clone();
                }
            })
            .or_insert_with(|| r.clone());
    }
    groups.into_values().map(measure).collect()
}

/// One record per campaign with spend share of the whole dataset.
pub fn by_campaign(records: &[RawRecord]) -> Vec<MeasuredRecord> {
    let mut rows = aggregate(records, |r| r.campaign_name.clone());
    for row in &mut rows {
        let r = &mut row.record;
        r.keyword = None;
        r.match_type = None;
        r.ad_group_name = None;
        r.month = None;
        r.date = None;
    }
    apply_spend_share(&mut rows, |_| ());
    rows
}

/// One record per campaign per month, ordered by month then campaign, with
/// spend share relative to that month only.
pub fn by_campaign_month(records: &[RawRecord]) -> Vec<MeasuredRecord> {
    let mut rows = aggregate(records, |r| {
        (
            r.month.as_ref().map(|m| m.index),
            r.campaign_name.clone(),
        )
    });
    apply_spend_share(&mut rows, month_index);
    rows
}

/// Campaign-month rows grouped per campaign, each series in month order.
pub fn series_by_campaign(rows: &[MeasuredRecord]) -> BTreeMap<&str, Vec<&MeasuredRecord>> {
    let mut series: BTreeMap<&str, Vec<&MeasuredRecord>> = BTreeMap::new();
    for row in rows {
        series
            .entry(row.record.campaign_name.as_str())
            .or_default()
            .push(row);
    }
    for points in series.values_mut() {
        points.sort_by_key(|r| month_index(r));
    }
    series
}

pub fn month_index(row: &MeasuredRecord) -> Option<i32> {
    row.record.month.as_ref().map(|m| m.index)
}

pub fn month_label(row: &MeasuredRecord) -> String {
    row.record
        .month
        .as_ref()
        .map(|m| m.label.clone())
        .unwrap_or_default()
}

/// Fill `spend_share` as percent of total cost among rows with the same
/// scope key.
pub fn apply_spend_share<K, F>(rows: &mut [MeasuredRecord], scope: F)
where
    K: Ord,
    F: Fn(&MeasuredRecord) -> K,
{
    let mut totals: BTreeMap<K, f64> = BTreeMap::new();
    for row in rows.iter() {
        *totals.entry(scope(row)).or_insert(0.0) += row.record.counters.cost;
    }
    for row in rows.iter_mut() {
        let total = totals.get(&scope(row)).copied().unwrap_or(0.0);
        row.metrics.spend_share = Some(if total > 0.0 {
            row.record.counters.cost / total * 100.0
        } else {
            0.0
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(campaign: &str, counters: Counters) -> RawRecord {
        RawRecord::campaign(campaign, counters)
    }

    #[test]
    fn test_zero_denominators() {
        let m = derive(&Counters::new(0, 0, 0.0, 0.0));
        assert!((m.ctr - 0.0).abs() < f64::EPSILON);
        assert!((m.conversion_rate - 0.0).abs() < f64::EPSILON);
        assert!((m.cpc - 0.0).abs() < f64::EPSILON);
        assert!(m.cpa.is_none());
        assert!((m.roas - 0.0).abs() < f64::EPSILON);

        let spend_only = derive(&Counters::new(100, 0, 50.0, 0.0));
        assert!((spend_only.ctr - 0.0).abs() < f64::EPSILON);
        assert!((spend_only.cpc - 0.0).abs() < f64::EPSILON);
        assert!(spend_only.cpa.is_none());
    }

    #[test]
    fn test_basic_rates() {
        let m = derive(&Counters::new(1000, 50, 100.0, 5.0).with_revenue(400.0));
        assert!((m.ctr - 5.0).abs() < f64::EPSILON);
        assert!((m.conversion_rate - 10.0).abs() < f64::EPSILON);
        assert!((m.cpc - 2.0).abs() < f64::EPSILON);
        assert_eq!(m.cpa, Some(20.0));
        assert!((m.roas - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_roas_zero_without_revenue_or_cost() {
        assert!((derive(&Counters::new(10, 1, 0.0, 1.0).with_revenue(50.0)).roas).abs() < f64::EPSILON);
        assert!((derive(&Counters::new(10, 1, 20.0, 1.0)).roas).abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregation_sums_before_dividing() {
        let rows = vec![
            row("A", Counters::new(1000, 100, 100.0, 1.0)),
            row("A", Counters::new(200, 10, 20.0, 9.0)),
        ];
        let agg = by_campaign(&rows);
        assert_eq!(agg.len(), 1);
        let expected = 10.0 / 110.0 * 100.0;
        assert!((agg[0].metrics.conversion_rate - expected).abs() < 1e-9);
        assert!((agg[0].metrics.conversion_rate - 45.5).abs() > 1.0);
    }

    #[test]
    fn test_spend_share_scoped_by_month() {
        let rows = vec![
            row("A", Counters::new(10, 1, 300.0, 0.0)).in_month("Mar 2025", 24302),
            row("B", Counters::new(10, 1, 100.0, 0.0)).in_month("Mar 2025", 24302),
            row("A", Counters::new(10, 1, 50.0, 0.0)).in_month("Apr 2025", 24303),
        ];
        let monthly = by_campaign_month(&rows);
        assert_eq!(monthly.len(), 3);
        assert_eq!(monthly[0].record.campaign_name, "A");
        assert_eq!(monthly[0].metrics.spend_share, Some(75.0));
        assert_eq!(monthly[1].metrics.spend_share, Some(25.0));
        assert_eq!(monthly[2].metrics.spend_share, Some(100.0));
    }

    #[test]
    fn test_campaign_order_is_deterministic() {
        let rows = vec![
            row("Zeta", Counters::new(1, 0, 1.0, 0.0)),
            row("Alpha", Counters::new(1, 0, 1.0, 0.0)),
        ];
        let names: Vec<String> = by_campaign(&rows)
            .into_iter()
            .map(|r| r.record.campaign_name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }
}
