//! Data loading utilities

use crate::error::{Result, TabularError};
use crate::table::{Column, Table, TemporalCell};
use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use polars::prelude::{CsvReadOptions, CsvWriter, SerReader, SerWriter};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Extensions accepted at the pipeline boundary
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// Parse strategy, chosen from the file extension only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    /// `.xlsx`/`.xls` are spreadsheets; every other path is read as delimited text
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match extension(path.as_ref()).as_deref() {
            Some("xlsx") | Some("xls") => FileFormat::Spreadsheet,
            _ => FileFormat::Csv,
        }
    }

    /// Whether the path carries one of [`SUPPORTED_EXTENSIONS`]
    pub fn is_supported(path: impl AsRef<Path>) -> bool {
        extension(path.as_ref())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Data loader for CSV and spreadsheet files
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows used for CSV schema inference, `None` scans the whole file
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
        }
    }

    /// Limit CSV schema inference to the first `rows` rows. A value that
    /// appears later and does not fit the inferred dtype fails the load.
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows.map(|r| r.max(1));
        self
    }

    /// Load a file, dispatching on its extension
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Table> {
        let path = path.as_ref();
        let start = Instant::now();

        if !path.is_file() {
            return Err(TabularError::unreadable(path, "file not found"));
        }

        let table = match FileFormat::from_path(path) {
            FileFormat::Csv => self.load_csv(path)?,
            FileFormat::Spreadsheet => self.load_spreadsheet(path)?,
        };

        if table.width() == 0 {
            return Err(TabularError::unreadable(path, "no columns could be inferred"));
        }

        info!(
            path = %path.display(),
            rows = table.height(),
            columns = table.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Ok(table)
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<Table> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TabularError::unreadable(path, e))?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| TabularError::unreadable(path, e))?;

        debug!(shape = ?df.shape(), "Parsed CSV");
        Table::from_dataframe(&df).map_err(|e| TabularError::unreadable(path, e))
    }

    /// Load the first worksheet of an `.xlsx`/`.xls` workbook
    pub fn load_spreadsheet(&self, path: impl AsRef<Path>) -> Result<Table> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto(path).map_err(|e| TabularError::unreadable(path, e))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| TabularError::unreadable(path, "workbook has no worksheets"))?
            .map_err(|e| TabularError::unreadable(path, e))?;

        let mut rows = range.rows();
        let header = match rows.next() {
            Some(header) => header,
            None => return Err(TabularError::unreadable(path, "worksheet is empty")),
        };
        let body: Vec<&[Data]> = rows.collect();

        let names = dedup_header_names(header.iter().enumerate().map(|(idx, cell)| match cell {
            Data::Empty => format!("Unnamed: {}", idx),
            other => other.to_string(),
        }));

        let empty = Data::Empty;
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let cells: Vec<&Data> = body.iter().map(|row| row.get(idx).unwrap_or(&empty)).collect();
                spreadsheet_column(name, &cells)
            })
            .collect();

        Table::new(columns).map_err(|e| TabularError::unreadable(path, e))
    }
}

/// Repeated header names get a `.1`, `.2`, ... suffix, skipping names already taken
fn dedup_header_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let names: Vec<String> = names.into_iter().collect();
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        let mut candidate = name.clone();
        let mut suffix = 1;
        while taken.contains(&candidate) {
            candidate = format!("{}.{}", name, suffix);
            suffix += 1;
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

fn is_missing_cell(cell: &Data) -> bool {
    matches!(cell, Data::Empty | Data::Error(_))
}

/// Type a spreadsheet column from its non-empty cells
fn spreadsheet_column(name: String, cells: &[&Data]) -> Column {
    let present: Vec<&Data> = cells.iter().copied().filter(|c| !is_missing_cell(c)).collect();

    let all_numeric = present
        .iter()
        .all(|c| matches!(c, Data::Int(_) | Data::Float(_)));
    if all_numeric {
        return Column::numeric(
            name,
            cells.iter().map(|c| match c {
                Data::Int(v) => Some(*v as f64),
                Data::Float(v) => Some(*v),
                _ => None,
            }),
        );
    }

    let all_dates = present
        .iter()
        .all(|c| matches!(c, Data::DateTime(_) | Data::DateTimeIso(_)) && c.as_datetime().is_some());
    if all_dates {
        return Column::temporal(
            name,
            cells.iter().map(|c| c.as_datetime().map(TemporalCell::Parsed)),
        );
    }

    Column::categorical(
        name,
        cells.iter().map(|c| {
            if is_missing_cell(c) {
                None
            } else {
                Some(c.to_string())
            }
        }),
    )
}

/// Data saver
pub struct DataSaver;

impl DataSaver {
    /// Save a table as CSV with a header row
    pub fn save_csv(table: &Table, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut df = table.to_dataframe()?;
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)?;

        debug!(path = %path.display(), rows = table.height(), "Saved CSV");
        Ok(())
    }
}

/// Location of the cleaned copy of a dataset: `cleaned_<stem>.csv` beside the input
pub fn cleaned_file_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    path.with_file_name(format!("cleaned_{}.csv", stem))
}

/// Load a dataset with the default loader
pub fn load(path: impl AsRef<Path>) -> Result<Table> {
    DataLoader::new().load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        writeln!(file, "age,city,score").unwrap();
        writeln!(file, "25,NY,1.5").unwrap();
        writeln!(file, ",LA,2.5").unwrap();
        writeln!(file, "40,,3.5").unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = create_test_csv();
        let table = DataLoader::new().load(file.path()).unwrap();

        assert_eq!(table.height(), 3);
        assert_eq!(table.width(), 3);
        assert_eq!(table.column("age").unwrap().column_type(), ColumnType::Numeric);
        assert_eq!(table.column("city").unwrap().column_type(), ColumnType::Categorical);
        assert_eq!(table.column("age").unwrap().null_count(), 1);
        assert_eq!(table.column("city").unwrap().null_count(), 1);
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let result = load("/definitely/not/here.csv");
        assert!(matches!(result, Err(TabularError::UnreadableFile { .. })));
    }

    #[test]
    fn test_corrupt_spreadsheet_is_unreadable() {
        let mut file = tempfile::Builder::new()
            .suffix(".xlsx")
            .tempfile()
            .unwrap();
        writeln!(file, "this is not a workbook").unwrap();

        let result = load(file.path());
        assert!(matches!(result, Err(TabularError::UnreadableFile { .. })));
    }

    #[test]
    fn test_file_format() {
        assert_eq!(FileFormat::from_path("a/b.XLSX"), FileFormat::Spreadsheet);
        assert_eq!(FileFormat::from_path("b.xls"), FileFormat::Spreadsheet);
        assert_eq!(FileFormat::from_path("b.csv"), FileFormat::Csv);
        assert_eq!(FileFormat::from_path("b.txt"), FileFormat::Csv);
        assert!(FileFormat::is_supported("x.csv"));
        assert!(!FileFormat::is_supported("x.parquet"));
        assert!(!FileFormat::is_supported("noext"));
    }

    #[test]
    fn test_cleaned_file_path() {
        let path = cleaned_file_path("/data/uploads/sales.xlsx");
        assert_eq!(path, PathBuf::from("/data/uploads/cleaned_sales.csv"));
    }

    #[test]
    fn test_save_csv() {
        let table = Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0), None]),
            Column::categorical("b", vec![Some("x"), None, Some("z")]),
        ])
        .unwrap();

        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        DataSaver::save_csv(&table, file.path()).unwrap();

        let loaded = load(file.path()).unwrap();
        assert_eq!(loaded.height(), 3);
        assert_eq!(loaded.width(), 2);
        assert_eq!(loaded.column("a").unwrap().null_count(), 1);
    }

    #[test]
    fn test_spreadsheet_column_typing() {
        let int = Data::Int(3);
        let float = Data::Float(2.5);
        let text = Data::String("x".into());
        let empty = Data::Empty;

        let numeric = spreadsheet_column("n".into(), &[&int, &empty, &float]);
        assert_eq!(numeric.column_type(), ColumnType::Numeric);
        assert_eq!(numeric.null_count(), 1);

        let mixed = spreadsheet_column("m".into(), &[&int, &text]);
        assert_eq!(mixed.column_type(), ColumnType::Categorical);

        let blank = spreadsheet_column("b".into(), &[&empty, &empty]);
        assert_eq!(blank.column_type(), ColumnType::Numeric);
        assert_eq!(blank.null_count(), 2);
    }

    fn create_test_workbook() -> NamedTempFile {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let mut workbook = Workbook::new();

        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "name").unwrap();
        // column 1 has no header cell
        sheet.write_string(0, 2, "score").unwrap();
        sheet.write_string(0, 3, "score").unwrap();
        sheet.write_string(0, 4, "joined").unwrap();

        sheet.write_string(1, 0, "ann").unwrap();
        sheet.write_number(1, 1, 10.0).unwrap();
        sheet.write_number(1, 2, 1.5).unwrap();
        sheet.write_number(1, 3, 2.0).unwrap();
        let jan = ExcelDateTime::from_ymd(2024, 1, 15).unwrap();
        sheet.write_datetime_with_format(1, 4, &jan, &date_format).unwrap();

        sheet.write_string(2, 0, "bob").unwrap();
        sheet.write_number(2, 1, 20.0).unwrap();
        sheet.write_number(2, 3, 3.0).unwrap();
        let feb = ExcelDateTime::from_ymd(2024, 2, 1).unwrap();
        sheet.write_datetime_with_format(2, 4, &feb, &date_format).unwrap();

        let second = workbook.add_worksheet();
        second.set_name("archive").unwrap();
        second.write_string(0, 0, "ignored").unwrap();

        workbook.save(file.path()).unwrap();
        file
    }

    #[test]
    fn test_load_spreadsheet_first_sheet() {
        let file = create_test_workbook();
        let table = load(file.path()).unwrap();

        assert_eq!(
            table.column_names(),
            vec!["name", "Unnamed: 1", "score", "score.1", "joined"]
        );
        assert_eq!(table.height(), 2);

        assert_eq!(table.column("name").unwrap().column_type(), ColumnType::Categorical);
        assert_eq!(
            table.column("Unnamed: 1").unwrap().as_numeric().unwrap(),
            &[Some(10.0), Some(20.0)]
        );
        assert_eq!(table.column("score").unwrap().null_count(), 1);
        assert_eq!(table.column("score.1").unwrap().column_type(), ColumnType::Numeric);

        let joined = table.column("joined").unwrap();
        assert_eq!(joined.column_type(), ColumnType::Temporal);
        assert_eq!(joined.data().render(0).as_deref(), Some("2024-01-15"));
    }

    #[test]
    fn test_dedup_header_names() {
        let names = dedup_header_names(
            ["a", "a", "a.1", "b", "a"].iter().map(|s| s.to_string()),
        );
        assert_eq!(names, vec!["a", "a.1", "a.1.1", "b", "a.2"]);
    }
}
