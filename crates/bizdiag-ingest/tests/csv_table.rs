use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use bizdiag_ingest::{IngestError, ProfileOptions, profile_table_with_options, read_csv_table};
use bizdiag_model::{CellValue, InferredType};
use proptest::prelude::*;

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    dir.push(format!("bizdiag_ingest_{name}_{stamp}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

#[test]
fn reads_bom_prefixed_exports() {
    let path = temp_file(
        "payroll.csv",
        "\u{feff}Pay Period Start , Pay Period End,Total Pay\n01/29/2024,02/11/2024,\"$4,200.00\"\n",
    );
    let table = read_csv_table(&path).expect("read csv");
    assert_eq!(table.source, "payroll.csv");
    assert_eq!(
        table.columns,
        vec!["Pay Period Start", "Pay Period End", "Total Pay"]
    );
    assert!(matches!(
        table.rows[0].get("Pay Period Start"),
        CellValue::Date(_)
    ));
    assert_eq!(
        table.rows[0].get("Total Pay"),
        &CellValue::Text("$4,200.00".into())
    );
}

#[test]
fn missing_file_is_an_io_error() {
    let path = std::env::temp_dir().join("bizdiag_ingest_does_not_exist.csv");
    let error = read_csv_table(&path).unwrap_err();
    assert!(matches!(error, IngestError::Io { .. }));
}

#[test]
fn invalid_utf8_is_a_structural_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("binary.csv");
    fs::write(&path, [b'a', b',', b'b', b'\n', 0xff, 0xfe, b',', b'1', b'\n']).expect("write");
    let error = read_csv_table(&path).unwrap_err();
    assert!(matches!(error, IngestError::Csv { .. }));
}

#[test]
fn sample_size_is_configurable() {
    let path = temp_file("many.csv", "Item\na\nb\nc\nd\ne\nf\ng\n");
    let table = read_csv_table(&path).unwrap();
    let profile = profile_table_with_options(&table, ProfileOptions::default().with_sample_size(3));
    let column = profile.get("Item").unwrap();
    assert_eq!(column.sample_values, vec!["a", "b", "c"]);
    assert_eq!(column.inferred_type, InferredType::Text);
}

proptest! {
    #[test]
    fn null_fraction_stays_in_unit_interval(cells in proptest::collection::vec("[0-9]{0,3}", 1..30)) {
        let mut text = String::from("Value\n");
        for cell in &cells {
            text.push_str(cell);
            text.push('\n');
        }
        let table = bizdiag_ingest::read_csv_str("p.csv", &text).unwrap();
        let profile = bizdiag_ingest::profile_table(&table);
        for column in &profile.columns {
            prop_assert!((0.0..=1.0).contains(&column.null_fraction));
            prop_assert!(column.unique_count <= column.row_count);
        }
    }
}
