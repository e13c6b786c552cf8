use bizdiag_config::VerticalConfig;
use bizdiag_ingest::read_csv_str;
use bizdiag_model::{FieldMapping, MappingResult, MonthKey, PackType, Transform};
use bizdiag_normalize::{NormalizeError, normalize_pack, prorate_period};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

const RESTAURANT: &str = include_str!("../../../verticals/restaurant.json");

fn config() -> VerticalConfig {
    VerticalConfig::from_json_str(RESTAURANT).unwrap()
}

fn mapping(pack: PackType, pairs: &[(&str, &str, Transform)]) -> MappingResult {
    MappingResult {
        pack,
        mappings: pairs
            .iter()
            .map(|(field, column, transform)| {
                FieldMapping::confirmed(*field, vec![(*column).to_string()], *transform)
            })
            .collect(),
        gaps: Vec::new(),
        unmapped_columns: Vec::new(),
    }
}

fn month(year: i32, m: u32) -> MonthKey {
    MonthKey::new(year, m).unwrap()
}

const PNL_CSV: &str = "\
Month,Sales,COGS
2024-01,1000,300
2024-02,1100,320
2024-02,9999,1
2024-03,tbd,310
2024-04 to 2024-06,3000,900
";

fn pnl_mapping() -> MappingResult {
    mapping(
        PackType::Pnl,
        &[
            ("month", "Month", Transform::ParseMonth),
            ("revenue", "Sales", Transform::ToNumber),
            ("cogs", "COGS", Transform::ToNumber),
        ],
    )
}

#[test]
fn pnl_flags_duplicates_spans_and_bad_numbers() {
    let config = config();
    let spec = config.pack(PackType::Pnl).unwrap();
    let table = read_csv_str("pnl.csv", PNL_CSV).unwrap();

    let panel = normalize_pack(spec, &table, &pnl_mapping()).unwrap();

    assert_eq!(panel.fields, vec!["revenue", "cogs"]);
    let months: Vec<MonthKey> = panel.months().collect();
    assert_eq!(months, vec![month(2024, 1), month(2024, 2), month(2024, 3)]);
    assert_eq!(panel.row(month(2024, 2)).unwrap().value("revenue"), Some(1100.0));
    assert_eq!(panel.row(month(2024, 3)).unwrap().value("revenue"), None);
    assert_eq!(panel.row(month(2024, 3)).unwrap().value("cogs"), Some(310.0));

    assert_eq!(panel.input_rows, 5);
    assert_eq!(panel.usable_rows, 3);
    assert_eq!(panel.warnings.len(), 3);
    assert!(panel.warnings[0].contains("row 3: duplicate of month 2024-02"));
    assert!(panel.warnings[1].contains("`Sales` value 'tbd' is not a number"));
    assert!(panel.warnings[2].contains("spans several months"));
    assert_eq!(panel.row(month(2024, 3)).unwrap().completeness_score, 0.0);
    assert_eq!(panel.row(month(2024, 3)).unwrap().warnings.len(), 1);

    // mean month completeness 2/3, 3 of 5 rows usable
    assert!((panel.completeness_score - 0.4).abs() < 1e-9);
}

#[test]
fn required_field_absent_is_structural() {
    let config = config();
    let spec = config.pack(PackType::Pnl).unwrap();
    let table = read_csv_str("pnl.csv", PNL_CSV).unwrap();
    let partial = mapping(PackType::Pnl, &[("month", "Month", Transform::ParseMonth)]);

    let err = normalize_pack(spec, &table, &partial).unwrap_err();
    assert_eq!(
        err,
        NormalizeError::MissingRequiredField {
            pack: PackType::Pnl,
            field: "revenue".into()
        }
    );
    assert_eq!(err.pack(), PackType::Pnl);
}

#[test]
fn mapping_to_absent_column_is_structural() {
    let config = config();
    let spec = config.pack(PackType::Pnl).unwrap();
    let table = read_csv_str("pnl.csv", PNL_CSV).unwrap();
    let wrong = mapping(
        PackType::Pnl,
        &[
            ("month", "Month", Transform::ParseMonth),
            ("revenue", "Net Sales", Transform::ToNumber),
        ],
    );
    assert!(matches!(
        normalize_pack(spec, &table, &wrong),
        Err(NormalizeError::ColumnNotFound { column, .. }) if column == "Net Sales"
    ));
}

#[test]
fn revenue_sums_per_month_and_counts_transactions() {
    let config = config();
    let spec = config.pack(PackType::Revenue).unwrap();
    let table = read_csv_str(
        "sales.csv",
        "Date,Amount,Discount\n\
         2024-01-03,100.50,5\n\
         2024-01-17,\"$1,000\",\n\
         2024-02-02,200,10\n\
         not a date,50,0\n",
    )
    .unwrap();
    let result = mapping(
        PackType::Revenue,
        &[
            ("transaction_date", "Date", Transform::ParseDate),
            ("revenue", "Amount", Transform::ToNumber),
            ("discount", "Discount", Transform::ToNumber),
        ],
    );

    let panel = normalize_pack(spec, &table, &result).unwrap();

    assert_eq!(panel.fields, vec!["revenue", "discount", "transaction_count"]);
    let january = panel.row(month(2024, 1)).unwrap();
    assert!((january.value("revenue").unwrap() - 1100.5).abs() < 1e-9);
    assert_eq!(january.value("discount"), Some(5.0));
    assert_eq!(january.value("transaction_count"), Some(2.0));
    assert_eq!(january.source_rows, 2);
    let february = panel.row(month(2024, 2)).unwrap();
    assert_eq!(february.value("transaction_count"), Some(1.0));

    assert_eq!(panel.usable_rows, 3);
    assert_eq!(panel.warnings, vec!["row 4: unreadable transaction date; rejected"]);
    assert!((panel.completeness_score - 0.75).abs() < 1e-9);
}

#[test]
fn labor_prorates_pay_periods() {
    let config = config();
    let spec = config.pack(PackType::Labor).unwrap();
    let table = read_csv_str(
        "payroll.csv",
        "Start,End,Total Pay,Hours\n\
         2024-01-25,2024-02-07,1400,70\n\
         2024-02-08,2024-02-21,1400,70\n\
         2024-03-10,2024-03-01,500,10\n\
         2024-03-01,,300,12\n",
    )
    .unwrap();
    let result = mapping(
        PackType::Labor,
        &[
            ("pay_period_start", "Start", Transform::ParseDate),
            ("pay_period_end", "End", Transform::ParseDate),
            ("labor", "Total Pay", Transform::ToNumber),
            ("labor_hours", "Hours", Transform::ToNumber),
        ],
    );

    let panel = normalize_pack(spec, &table, &result).unwrap();

    let value = |m: u32, field: &str| panel.row(month(2024, m)).unwrap().value(field).unwrap();
    assert!((value(1, "labor") - 700.0).abs() < 1e-9);
    assert!((value(2, "labor") - 2100.0).abs() < 1e-9);
    assert!((value(3, "labor") - 300.0).abs() < 1e-9);
    assert!((value(2, "labor_hours") - 105.0).abs() < 1e-9);

    let total: f64 = panel.rows.iter().filter_map(|row| row.value("labor")).sum();
    assert!((total - 3100.0).abs() < 1e-9);

    assert_eq!(panel.usable_rows, 3);
    assert_eq!(panel.warnings.len(), 2);
    assert!(panel.warnings[0].contains("ends (2024-03-01) before it starts (2024-03-10)"));
    assert!(panel.warnings[1].contains("pay period end missing"));
}

#[test]
fn empty_upload_is_an_empty_panel() {
    let config = config();
    let spec = config.pack(PackType::Pnl).unwrap();
    let table = read_csv_str("pnl.csv", "Month,Sales\n").unwrap();
    let result = mapping(
        PackType::Pnl,
        &[
            ("month", "Month", Transform::ParseMonth),
            ("revenue", "Sales", Transform::ToNumber),
        ],
    );
    let panel = normalize_pack(spec, &table, &result).unwrap();
    assert!(panel.is_empty());
    assert_eq!(panel.completeness_score, 0.0);
}

proptest! {
    #[test]
    fn prorated_shares_sum_to_total(
        start_offset in 0i64..12_000,
        length in 0i64..400,
        total in -1.0e7f64..1.0e7,
    ) {
        let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let start = base + Duration::days(start_offset);
        let end = start + Duration::days(length);
        let shares = prorate_period(start, end, total);

        let sum: f64 = shares.iter().map(|(_, share)| share).sum();
        prop_assert!((sum - total).abs() <= 1e-6 * total.abs().max(1.0));

        prop_assert_eq!(shares.first().map(|(m, _)| *m), Some(MonthKey::from_date(start)));
        prop_assert_eq!(shares.last().map(|(m, _)| *m), Some(MonthKey::from_date(end)));
        for pair in shares.windows(2) {
            prop_assert_eq!(pair[1].0.months_since(pair[0].0), 1);
        }
    }
}
