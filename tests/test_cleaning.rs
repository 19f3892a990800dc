//! Integration test: Cleaning engine on files and tables

use std::io::Write;
use std::path::{Path, PathBuf};
use tabular_ml::pipeline::{clean_dataset, generate_eda};
use tabular_ml::preprocessing::{CleaningConfig, DataCleaner};
use tabular_ml::table::{Column, ColumnData, ColumnType, Table, TemporalCell};
use tabular_ml::utils::DataLoader;

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

const SIGNUPS: &str = "\
age,city,signup_date
30,NY,2023-01-05
,LA,2023-02-10
40,NY,2023-03-15
25,,2023-04-20
30,NY,2023-01-05
";

#[test]
fn test_signup_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "signups.csv", SIGNUPS);

    let table = DataLoader::new().load(&path).unwrap();
    let (cleaned, report) = DataCleaner::default().clean(table);

    assert_eq!(report.rows_before, 5);
    assert_eq!(report.rows_removed_as_duplicate, 1);
    assert_eq!(report.rows_after, 4);
    assert_eq!(report.date_columns_converted, vec!["signup_date"]);

    // median of 30, 40, 25
    let age = cleaned.column("age").unwrap().as_numeric().unwrap();
    assert_eq!(age[1], Some(30.0));

    match cleaned.column("city").unwrap().data() {
        ColumnData::Categorical(values) => assert_eq!(values[3].as_deref(), Some("NY")),
        other => panic!("city should stay categorical, got {:?}", other.column_type()),
    }

    let signup = cleaned.column("signup_date").unwrap();
    assert_eq!(signup.column_type(), ColumnType::Temporal);
    match signup.data() {
        ColumnData::Temporal(values) => {
            assert!(values.iter().all(|v| matches!(v, Some(TemporalCell::Parsed(_)))));
        }
        _ => unreachable!(),
    }

    for column in cleaned.columns() {
        assert_eq!(column.null_count(), 0, "column {} still has missing values", column.name());
    }
}

#[test]
fn test_clean_dataset_round_trip_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "signups.csv", SIGNUPS);

    let (cleaned_path, first) = clean_dataset(&path).unwrap();
    assert_eq!(cleaned_path.file_name().unwrap(), "cleaned_signups.csv");

    let reloaded = DataLoader::new().load(&cleaned_path).unwrap();
    assert_eq!(reloaded.height(), first.rows_after);

    let (_, second) = DataCleaner::default().clean(reloaded);
    assert_eq!(second.rows_removed_as_duplicate, 0);
    assert_eq!(second.rows_after, first.rows_after);
}

#[test]
fn test_cleaning_twice_in_memory() {
    let table = Table::new(vec![
        Column::numeric("x", vec![Some(1.0), Some(1.0), None, Some(3.0)]),
        Column::categorical("label", vec![Some("a"), Some("a"), Some("b"), None]),
    ])
    .unwrap();

    let cleaner = DataCleaner::default();
    let (once, first) = cleaner.clean(table);
    let (twice, second) = cleaner.clean(once.clone());

    assert_eq!(second.rows_removed_as_duplicate, 0);
    assert_eq!(second.rows_after, first.rows_after);
    assert_eq!(once, twice);
}

#[test]
fn test_entirely_missing_columns() {
    let table = Table::new(vec![
        Column::numeric("empty_numeric", vec![None, None, None]),
        Column::categorical::<String>("empty_text", vec![None, None, None]),
        Column::numeric("id", vec![Some(1.0), Some(2.0), Some(3.0)]),
    ])
    .unwrap();

    let (cleaned, report) = DataCleaner::default().clean(table);

    assert_eq!(report.unfilled_columns, vec!["empty_numeric"]);
    assert_eq!(cleaned.column("empty_numeric").unwrap().null_count(), 3);

    match cleaned.column("empty_text").unwrap().data() {
        ColumnData::Categorical(values) => {
            assert!(values.iter().all(|v| v.as_deref() == Some("Unknown")));
        }
        _ => panic!("expected categorical column"),
    }
}

#[test]
fn test_custom_placeholder_and_duplicates_kept() {
    let table = Table::new(vec![
        Column::categorical::<&str>("color", vec![None, None]),
        Column::numeric("n", vec![Some(1.0), Some(1.0)]),
    ])
    .unwrap();

    let config = CleaningConfig::default()
        .with_missing_placeholder("n/a")
        .with_drop_duplicates(false);
    let (cleaned, report) = DataCleaner::new(config).clean(table);

    assert_eq!(report.rows_after, 2);
    assert_eq!(cleaned.column("color").unwrap().data().render(0).as_deref(), Some("n/a"));
}

#[test]
fn test_unparseable_dates_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "events.csv",
        "event_time,kind\n2024-05-01 10:30:00,a\nsoon,b\n",
    );

    let table = DataLoader::new().load(&path).unwrap();
    let (cleaned, report) = DataCleaner::default().clean(table);

    assert_eq!(report.date_columns_converted, vec!["event_time"]);
    match cleaned.column("event_time").unwrap().data() {
        ColumnData::Temporal(values) => {
            assert!(matches!(values[0], Some(TemporalCell::Parsed(_))));
            assert_eq!(values[1], Some(TemporalCell::Unparsed("soon".to_string())));
        }
        _ => panic!("expected temporal column"),
    }
}

#[test]
fn test_unreadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.csv");
    assert!(clean_dataset(&missing).is_err());
}

#[test]
fn test_text_after_long_numeric_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = String::from("code,qty\n");
    for i in 0..1500 {
        csv.push_str(&format!("{},{}\n", 1000 + i, i % 7));
    }
    csv.push_str("A12,3\n");
    let path = write_file(dir.path(), "late.csv", &csv);

    let table = DataLoader::new().load(&path).unwrap();

    assert_eq!(table.height(), 1501);
    assert_eq!(table.column("code").unwrap().column_type(), ColumnType::Categorical);
    assert_eq!(table.column("code").unwrap().data().render(1500).as_deref(), Some("A12"));
    assert_eq!(table.column("qty").unwrap().column_type(), ColumnType::Numeric);
}

#[test]
fn test_empty_csv_column_stays_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "sparse.csv", "a,b\n1,\n2,\n3,\n");

    let table = DataLoader::new().load(&path).unwrap();
    assert_eq!(table.column("b").unwrap().column_type(), ColumnType::Numeric);

    let (cleaned, report) = DataCleaner::default().clean(table);
    assert_eq!(report.unfilled_columns, vec!["b"]);
    assert_eq!(cleaned.column("b").unwrap().null_count(), 3);

    let eda = generate_eda(&path).unwrap();
    assert_eq!(eda.summary_stats["b"].count, 0);
    assert_eq!(eda.summary_stats["b"].mean, None);
}
