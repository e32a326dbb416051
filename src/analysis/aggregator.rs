//! Report aggregation.
//!
//! Each report kind is a pure function over a snapshot of sale records:
//! group by the report's key, sum the metric, order, and truncate.
//! Groups keep the order in which they first appear in the snapshot, so
//! ties in the metric resolve to first appearance.

use crate::models::{
    DataError, Field, Ident, ReportKind, ReportResult, ReportRow, SaleDate, SaleRecord, Season,
};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::hash::Hash;
use tracing::debug;

/// Aggregate a snapshot of records into the given report.
pub fn aggregate(kind: ReportKind, records: &[SaleRecord]) -> Result<ReportResult, DataError> {
    let mut rows = match kind {
        ReportKind::TopCustomers => top_customers(records)?,
        ReportKind::TopProducts | ReportKind::MostDemanded => products_by_quantity(records)?,
        ReportKind::BranchProducts => branch_products(records)?,
        ReportKind::TopBranches => top_branches(records)?,
        ReportKind::MonthlyTrend => monthly_trend(records)?,
        ReportKind::SeasonalTrend => seasonal_trend(records)?,
        ReportKind::BestPerSeason => best_per_season(records)?,
    };

    kind.limit().apply(&mut rows);

    debug!(
        "Aggregated {} records into {} rows for {:?}",
        records.len(),
        rows.len(),
        kind
    );

    Ok(ReportResult {
        kind,
        records: records.len(),
        rows,
    })
}

/// Sum `metric` per `key`, keeping groups in first-appearance order.
fn group_sum<K, FK, FM>(
    records: &[SaleRecord],
    key: FK,
    metric: FM,
) -> Result<IndexMap<K, f64>, DataError>
where
    K: Hash + Eq,
    FK: Fn(usize, &SaleRecord) -> Result<K, DataError>,
    FM: Fn(usize, &SaleRecord) -> Result<f64, DataError>,
{
    let mut groups: IndexMap<K, f64> = IndexMap::new();

    for (index, record) in records.iter().enumerate() {
        let k = key(index, record)?;
        let v = metric(index, record)?;
        *groups.entry(k).or_insert(0.0) += v;
    }

    Ok(groups)
}

/// Stable descending sort on the metric.
fn sort_desc(rows: &mut [ReportRow]) {
    rows.sort_by(|a, b| b.value.total_cmp(&a.value));
}

fn top_customers(records: &[SaleRecord]) -> Result<Vec<ReportRow>, DataError> {
    let groups = group_sum(
        records,
        |i, r| {
            Ok((
                required_id(i, Field::CustomerId, &r.customer_id)?,
                required_text(i, Field::CustomerName, &r.customer_name)?,
            ))
        },
        |i, r| money(i, Field::TotalPrice, r.total_price),
    )?;

    let mut rows: Vec<ReportRow> = groups
        .into_iter()
        .map(|((id, name), value)| ReportRow {
            key: vec![id, name.clone()],
            labels: vec![name],
            value,
        })
        .collect();
    sort_desc(&mut rows);
    Ok(rows)
}

fn products_by_quantity(records: &[SaleRecord]) -> Result<Vec<ReportRow>, DataError> {
    let groups = group_sum(
        records,
        |i, r| {
            Ok((
                required_id(i, Field::ProductId, &r.product_id)?,
                required_text(i, Field::ProductName, &r.product_name)?,
            ))
        },
        |i, r| quantity(i, r.quantity),
    )?;

    let mut rows: Vec<ReportRow> = groups
        .into_iter()
        .map(|((id, name), value)| ReportRow {
            key: vec![id, name.clone()],
            labels: vec![name],
            value,
        })
        .collect();
    sort_desc(&mut rows);
    Ok(rows)
}

fn branch_products(records: &[SaleRecord]) -> Result<Vec<ReportRow>, DataError> {
    let groups = group_sum(
        records,
        |i, r| {
            Ok((
                required_id(i, Field::BranchId, &r.branch_id)?,
                required_text(i, Field::BranchName, &r.branch_name)?,
                required_text(i, Field::ProductName, &r.product_name)?,
            ))
        },
        |i, r| quantity(i, r.quantity),
    )?;

    let mut rows: Vec<ReportRow> = groups
        .into_iter()
        .map(|((id, branch, product), value)| ReportRow {
            key: vec![id, branch.clone(), product.clone()],
            labels: vec![branch, product],
            value,
        })
        .collect();
    sort_desc(&mut rows);
    Ok(rows)
}

/// Revenue per branch, derived as quantity times unit price.
fn top_branches(records: &[SaleRecord]) -> Result<Vec<ReportRow>, DataError> {
    let groups = group_sum(
        records,
        |i, r| {
            Ok((
                required_id(i, Field::BranchId, &r.branch_id)?,
                required_text(i, Field::BranchName, &r.branch_name)?,
            ))
        },
        |i, r| Ok(quantity(i, r.quantity)? * money(i, Field::Price, r.price)?),
    )?;

    let mut rows: Vec<ReportRow> = groups
        .into_iter()
        .map(|((id, name), value)| ReportRow {
            key: vec![id, name.clone()],
            labels: vec![name],
            value,
        })
        .collect();
    sort_desc(&mut rows);
    Ok(rows)
}

fn monthly_trend(records: &[SaleRecord]) -> Result<Vec<ReportRow>, DataError> {
    let mut months: BTreeMap<(i32, u32), f64> = BTreeMap::new();

    for (index, record) in records.iter().enumerate() {
        let date = sale_date(index, record.sale_date)?;
        let value = money(index, Field::TotalPrice, record.total_price)?;
        *months.entry((date.year(), date.month())).or_insert(0.0) += value;
    }

    Ok(months
        .into_iter()
        .map(|((year, month), value)| {
            let label = format!("{year:04}-{month:02}");
            ReportRow {
                key: vec![label.clone()],
                labels: vec![label],
                value,
            }
        })
        .collect())
}

fn seasonal_trend(records: &[SaleRecord]) -> Result<Vec<ReportRow>, DataError> {
    let groups = group_sum(
        records,
        |i, r| Ok(Season::from_month(sale_date(i, r.sale_date)?.month())),
        |i, r| money(i, Field::TotalPrice, r.total_price),
    )?;

    let mut rows: Vec<ReportRow> = groups
        .into_iter()
        .map(|(season, value)| ReportRow {
            key: vec![season.to_string()],
            labels: vec![season.to_string()],
            value,
        })
        .collect();
    sort_desc(&mut rows);
    Ok(rows)
}

/// Top product per season, seasons in calendar display order.
fn best_per_season(records: &[SaleRecord]) -> Result<Vec<ReportRow>, DataError> {
    let groups = group_sum(
        records,
        |i, r| {
            Ok((
                Season::from_month(sale_date(i, r.sale_date)?.month()),
                required_id(i, Field::ProductId, &r.product_id)?,
                required_text(i, Field::ProductName, &r.product_name)?,
            ))
        },
        |i, r| money(i, Field::TotalPrice, r.total_price),
    )?;

    let mut best: BTreeMap<Season, ((String, String), f64)> = BTreeMap::new();
    for ((season, id, name), value) in groups {
        match best.get(&season) {
            Some((_, current)) if *current >= value => {}
            _ => {
                best.insert(season, ((id, name), value));
            }
        }
    }

    Ok(best
        .into_iter()
        .map(|(season, ((id, name), value))| ReportRow {
            key: vec![season.to_string(), id, name.clone()],
            labels: vec![season.to_string(), name],
            value,
        })
        .collect())
}

fn required_id(index: usize, field: Field, value: &Option<Ident>) -> Result<String, DataError> {
    value
        .as_ref()
        .map(|id| id.0.clone())
        .ok_or(DataError::MissingField { index, field })
}

fn required_text(index: usize, field: Field, value: &Option<String>) -> Result<String, DataError> {
    value.clone().ok_or(DataError::MissingField { index, field })
}

fn quantity(index: usize, value: Option<f64>) -> Result<f64, DataError> {
    let field = Field::Quantity;
    match amount(index, field, value)? {
        q if q.fract() != 0.0 => Err(DataError::InvalidNumber { index, field }),
        q => Ok(q),
    }
}

fn money(index: usize, field: Field, value: Option<f64>) -> Result<f64, DataError> {
    amount(index, field, value)
}

fn amount(index: usize, field: Field, value: Option<f64>) -> Result<f64, DataError> {
    match value {
        None => Err(DataError::MissingField { index, field }),
        Some(v) if !v.is_finite() || v < 0.0 => Err(DataError::InvalidNumber { index, field }),
        Some(v) => Ok(v),
    }
}

fn sale_date(index: usize, value: Option<SaleDate>) -> Result<SaleDate, DataError> {
    value.ok_or(DataError::MissingField {
        index,
        field: Field::SaleDate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn product(id: i64, name: &str, quantity: u32) -> SaleRecord {
        SaleRecord {
            product_id: Some(Ident(id.to_string())),
            product_name: Some(name.to_string()),
            quantity: Some(quantity.into()),
            ..Default::default()
        }
    }

    fn dated(year: i32, month: u32, total: f64) -> SaleRecord {
        SaleRecord {
            sale_date: NaiveDate::from_ymd_opt(year, month, 15).map(SaleDate),
            total_price: Some(total),
            ..Default::default()
        }
    }

    /// A record with every field set; `n` varies keys and values.
    fn full(n: u64) -> SaleRecord {
        let month = (n % 12) as u32 + 1;
        SaleRecord {
            customer_id: Some(Ident(format!("C{}", n % 13))),
            customer_name: Some(format!("Customer {}", n % 13)),
            product_id: Some(Ident(format!("P{}", n % 17))),
            product_name: Some(format!("Product {}", n % 17)),
            branch_id: Some(Ident(format!("B{}", n % 23))),
            branch_name: Some(format!("Branch {}", n % 23)),
            quantity: Some((n % 7 + 1) as f64),
            price: Some((n % 5) as f64 + 0.5),
            total_price: Some((n % 11) as f64 * 10.0),
            sale_date: NaiveDate::from_ymd_opt(2022 + (n % 3) as i32, month, 1).map(SaleDate),
        }
    }

    fn snapshot() -> Vec<SaleRecord> {
        (0..400).map(full).collect()
    }

    fn labels(result: &ReportResult) -> Vec<(Vec<String>, f64)> {
        result
            .rows
            .iter()
            .map(|r| (r.labels.clone(), r.value))
            .collect()
    }

    #[rstest]
    #[case(ReportKind::TopCustomers, Some(10), true)]
    #[case(ReportKind::TopProducts, Some(10), true)]
    #[case(ReportKind::BranchProducts, Some(20), true)]
    #[case(ReportKind::TopBranches, Some(20), true)]
    #[case(ReportKind::MonthlyTrend, None, false)]
    #[case(ReportKind::SeasonalTrend, Some(4), true)]
    #[case(ReportKind::BestPerSeason, Some(4), false)]
    #[case(ReportKind::MostDemanded, Some(5), true)]
    fn test_report_table(
        #[case] kind: ReportKind,
        #[case] max_rows: Option<usize>,
        #[case] metric_desc: bool,
    ) {
        let result = aggregate(kind, &snapshot()).unwrap();

        assert_eq!(result.kind, kind);
        assert!(!result.is_empty());
        if let Some(max) = max_rows {
            assert!(result.rows.len() <= max, "{kind:?} returned {}", result.rows.len());
        }
        if metric_desc {
            assert!(result.rows.windows(2).all(|w| w[0].value >= w[1].value));
        }
        assert!(result
            .rows
            .iter()
            .all(|r| r.labels.len() == kind.label_headings().len()));
    }

    #[rstest]
    #[case(ReportKind::TopCustomers)]
    #[case(ReportKind::TopProducts)]
    #[case(ReportKind::BranchProducts)]
    #[case(ReportKind::TopBranches)]
    #[case(ReportKind::MonthlyTrend)]
    #[case(ReportKind::SeasonalTrend)]
    #[case(ReportKind::BestPerSeason)]
    #[case(ReportKind::MostDemanded)]
    fn test_empty_input_yields_empty_result(#[case] kind: ReportKind) {
        let result = aggregate(kind, &[]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_top_products_example() {
        let records = vec![product(1, "A", 5), product(1, "A", 3), product(2, "B", 10)];

        let result = aggregate(ReportKind::TopProducts, &records).unwrap();

        assert_eq!(
            labels(&result),
            vec![(vec!["B".to_string()], 10.0), (vec!["A".to_string()], 8.0)]
        );
        assert_eq!(result.rows[0].key, vec!["2".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_top_products_truncates_to_ten() {
        let records: Vec<SaleRecord> = (0..15).map(|i| product(i, &format!("P{i}"), i as u32)).collect();

        let result = aggregate(ReportKind::TopProducts, &records).unwrap();

        assert_eq!(result.rows.len(), 10);
        assert_eq!(result.rows[0].value, 14.0);
        assert_eq!(result.rows[9].value, 5.0);
    }

    #[test]
    fn test_most_demanded_keeps_five() {
        let records: Vec<SaleRecord> = (0..9).map(|i| product(i, &format!("P{i}"), 100 - i as u32)).collect();

        let result = aggregate(ReportKind::MostDemanded, &records).unwrap();

        assert_eq!(result.rows.len(), 5);
        assert_eq!(result.rows[4].labels, vec!["P4".to_string()]);
    }

    #[test]
    fn test_same_name_different_ids_stay_separate() {
        let records = vec![product(1, "Tea", 2), product(2, "Tea", 3)];

        let result = aggregate(ReportKind::TopProducts, &records).unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].key[0], "2");
    }

    #[test]
    fn test_ties_keep_first_appearance() {
        let records = vec![product(9, "Late", 4), product(3, "Early", 4), product(5, "Mid", 4)];

        let result = aggregate(ReportKind::TopProducts, &records).unwrap();

        let names: Vec<&str> = result.rows.iter().map(|r| r.labels[0].as_str()).collect();
        assert_eq!(names, vec!["Late", "Early", "Mid"]);
    }

    #[test]
    fn test_top_customers_sums_total_price() {
        let customer = |id: i64, name: &str, total: f64| SaleRecord {
            customer_id: Some(Ident(id.to_string())),
            customer_name: Some(name.to_string()),
            total_price: Some(total),
            ..Default::default()
        };
        let records = vec![
            customer(1, "Ali", 100.0),
            customer(2, "Sara", 250.0),
            customer(1, "Ali", 200.0),
        ];

        let result = aggregate(ReportKind::TopCustomers, &records).unwrap();

        assert_eq!(
            labels(&result),
            vec![(vec!["Ali".to_string()], 300.0), (vec!["Sara".to_string()], 250.0)]
        );
    }

    #[test]
    fn test_branch_products_groups_by_branch_and_product() {
        let sale = |branch: i64, branch_name: &str, product: &str, qty: u32| SaleRecord {
            branch_id: Some(Ident(branch.to_string())),
            branch_name: Some(branch_name.to_string()),
            product_name: Some(product.to_string()),
            quantity: Some(qty.into()),
            ..Default::default()
        };
        let records = vec![
            sale(1, "Cairo", "Milk", 5),
            sale(2, "Alex", "Milk", 7),
            sale(1, "Cairo", "Milk", 4),
            sale(1, "Cairo", "Bread", 1),
        ];

        let result = aggregate(ReportKind::BranchProducts, &records).unwrap();

        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.rows[0].labels, vec!["Cairo".to_string(), "Milk".to_string()]);
        assert_eq!(result.rows[0].value, 9.0);
        assert_eq!(result.rows[1].labels, vec!["Alex".to_string(), "Milk".to_string()]);
        assert_eq!(result.rows[2].value, 1.0);
    }

    #[test]
    fn test_top_branches_derives_revenue() {
        let sale = |branch: i64, qty: u32, price: f64, total: f64| SaleRecord {
            branch_id: Some(Ident(branch.to_string())),
            branch_name: Some(format!("Branch {branch}")),
            quantity: Some(qty.into()),
            price: Some(price),
            // deliberately inconsistent with qty * price
            total_price: Some(total),
            ..Default::default()
        };
        let records = vec![sale(1, 2, 10.0, 999.0), sale(1, 3, 5.0, 999.0), sale(2, 1, 30.0, 1.0)];

        let result = aggregate(ReportKind::TopBranches, &records).unwrap();

        assert_eq!(result.rows[0].labels, vec!["Branch 1".to_string()]);
        assert_eq!(result.rows[0].value, 35.0);
        assert_eq!(result.rows[1].value, 30.0);
    }

    #[test]
    fn test_monthly_trend_sorted_by_date() {
        let records = vec![
            dated(2024, 3, 10.0),
            dated(2023, 11, 5.0),
            dated(2024, 1, 1.0),
            dated(2024, 3, 20.0),
            dated(2023, 11, 2.0),
        ];

        let result = aggregate(ReportKind::MonthlyTrend, &records).unwrap();

        assert_eq!(
            labels(&result),
            vec![
                (vec!["2023-11".to_string()], 7.0),
                (vec!["2024-01".to_string()], 1.0),
                (vec!["2024-03".to_string()], 30.0),
            ]
        );
    }

    #[test]
    fn test_monthly_trend_separates_years() {
        let records = vec![dated(2023, 5, 1.0), dated(2024, 5, 1.0)];

        let result = aggregate(ReportKind::MonthlyTrend, &records).unwrap();

        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_seasonal_trend_example() {
        let records = vec![
            dated(2024, 1, 100.0),
            dated(2024, 4, 100.0),
            dated(2024, 7, 100.0),
            dated(2024, 10, 100.0),
        ];

        let result = aggregate(ReportKind::SeasonalTrend, &records).unwrap();

        assert_eq!(result.rows.len(), 4);
        assert!(result.rows.iter().all(|r| r.value == 100.0));
        let mut seasons: Vec<String> = result.rows.iter().map(|r| r.labels[0].clone()).collect();
        seasons.sort();
        assert_eq!(seasons, vec!["Autumn", "Spring", "Summer", "Winter"]);
    }

    #[test]
    fn test_seasonal_trend_orders_by_metric() {
        let records = vec![dated(2024, 12, 10.0), dated(2024, 7, 50.0), dated(2024, 2, 15.0)];

        let result = aggregate(ReportKind::SeasonalTrend, &records).unwrap();

        assert_eq!(
            labels(&result),
            vec![
                (vec!["Summer".to_string()], 50.0),
                (vec!["Winter".to_string()], 25.0),
            ]
        );
    }

    #[test]
    fn test_best_per_season() {
        let sale = |month: u32, id: i64, name: &str, total: f64| SaleRecord {
            product_id: Some(Ident(id.to_string())),
            product_name: Some(name.to_string()),
            ..dated(2024, month, total)
        };
        let records = vec![
            sale(7, 1, "Ice Cream", 80.0),
            sale(1, 2, "Soup", 40.0),
            sale(12, 3, "Coat", 30.0),
            sale(1, 3, "Coat", 30.0),
            sale(8, 2, "Soup", 10.0),
            sale(4, 4, "Umbrella", 5.0),
        ];

        let result = aggregate(ReportKind::BestPerSeason, &records).unwrap();

        assert_eq!(
            labels(&result),
            vec![
                (vec!["Winter".to_string(), "Coat".to_string()], 60.0),
                (vec!["Spring".to_string(), "Umbrella".to_string()], 5.0),
                (vec!["Summer".to_string(), "Ice Cream".to_string()], 80.0),
            ]
        );
    }

    #[test]
    fn test_best_per_season_tie_goes_to_first_product() {
        let sale = |id: i64, name: &str| SaleRecord {
            product_id: Some(Ident(id.to_string())),
            product_name: Some(name.to_string()),
            ..dated(2024, 10, 20.0)
        };
        let records = vec![sale(1, "First"), sale(2, "Second")];

        let result = aggregate(ReportKind::BestPerSeason, &records).unwrap();

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].labels, vec!["Autumn".to_string(), "First".to_string()]);
    }

    #[test]
    fn test_missing_field_is_reported() {
        let mut records = vec![product(1, "A", 5), product(2, "B", 1)];
        records[1].quantity = None;

        let err = aggregate(ReportKind::TopProducts, &records).unwrap_err();

        assert!(matches!(
            err,
            DataError::MissingField {
                index: 1,
                field: Field::Quantity
            }
        ));
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let mut records = vec![dated(2024, 1, 10.0)];
        records[0].total_price = Some(-1.0);

        let err = aggregate(ReportKind::MonthlyTrend, &records).unwrap_err();

        assert!(matches!(err, DataError::InvalidNumber { index: 0, .. }));
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let mut records = vec![product(1, "A", 5), product(2, "B", 1)];
        records[1].quantity = Some(-2.0);

        let err = aggregate(ReportKind::MostDemanded, &records).unwrap_err();

        assert!(matches!(
            err,
            DataError::InvalidNumber {
                index: 1,
                field: Field::Quantity
            }
        ));
    }

    #[test]
    fn test_fractional_quantity_is_rejected() {
        let mut records = vec![product(1, "A", 5)];
        records[0].quantity = Some(2.5);

        let err = aggregate(ReportKind::TopProducts, &records).unwrap_err();

        assert!(matches!(err, DataError::InvalidNumber { index: 0, .. }));
    }

    #[test]
    fn test_non_finite_price_is_rejected() {
        let mut records = vec![product(1, "A", 2)];
        records[0].branch_id = Some(Ident("1".to_string()));
        records[0].branch_name = Some("Cairo".to_string());
        records[0].price = Some(f64::NAN);

        let err = aggregate(ReportKind::TopBranches, &records).unwrap_err();

        assert!(matches!(
            err,
            DataError::InvalidNumber {
                index: 0,
                field: Field::Price
            }
        ));
    }
}
