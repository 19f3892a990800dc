//! One-hot feature encoding and schema realignment

use crate::error::{Result, TabularError};
use crate::table::{Column, ColumnData, Table};
use indexmap::IndexMap;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// One raw feature record: column name to JSON value
pub type FeatureRecord = IndexMap<String, Value>;

/// Ordered encoded column names a trained model expects
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema(Vec<String>);

impl FeatureSchema {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self(columns.into_iter().map(Into::into).collect())
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|c| c == name)
    }
}

impl From<Vec<String>> for FeatureSchema {
    fn from(columns: Vec<String>) -> Self {
        Self(columns)
    }
}

/// Training target, numeric or label-valued depending on the target column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetVector {
    Numeric(Vec<f64>),
    Labels(Vec<String>),
}

impl TargetVector {
    pub fn len(&self) -> usize {
        match self {
            TargetVector::Numeric(v) => v.len(),
            TargetVector::Labels(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the given rows, in order
    pub fn take(&self, rows: &[usize]) -> TargetVector {
        match self {
            TargetVector::Numeric(v) => TargetVector::Numeric(rows.iter().map(|&i| v[i]).collect()),
            TargetVector::Labels(v) => {
                TargetVector::Labels(rows.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// Output of fit-mode encoding
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    pub features: Array2<f64>,
    pub schema: FeatureSchema,
    pub target: TargetVector,
}

/// One-hot expansion of a table.
///
/// Numeric columns pass through in table order, followed by one indicator per
/// distinct value (sorted) of each non-numeric column. Missing numeric cells
/// are `NaN`; a missing categorical cell sets none of its indicators.
fn expand(table: &Table) -> (Vec<String>, Vec<Vec<f64>>) {
    let mut names = Vec::new();
    let mut values = Vec::new();

    for column in table.numeric_columns() {
        if let ColumnData::Numeric(cells) = column.data() {
            names.push(column.name().to_string());
            values.push(cells.iter().map(|v| v.unwrap_or(f64::NAN)).collect());
        }
    }

    let height = table.height();
    for column in table.columns().iter().filter(|c| !c.column_type().is_numeric()) {
        let rendered: Vec<Option<String>> = (0..height).map(|i| column.data().render(i)).collect();
        let categories: BTreeSet<&str> = rendered.iter().flatten().map(String::as_str).collect();

        for category in categories {
            names.push(format!("{}_{}", column.name(), category));
            values.push(
                rendered
                    .iter()
                    .map(|v| if v.as_deref() == Some(category) { 1.0 } else { 0.0 })
                    .collect(),
            );
        }
    }

    (names, values)
}

fn to_matrix(columns: &[&[f64]], n_rows: usize) -> Array2<f64> {
    let mut matrix = Array2::zeros((n_rows, columns.len()));
    for (j, col) in columns.iter().enumerate() {
        for (i, &v) in col.iter().enumerate() {
            matrix[[i, j]] = v;
        }
    }
    matrix
}

/// One-hot encoder holding the fitted feature schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    schema: Option<FeatureSchema>,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder that realigns to an existing schema
    pub fn from_schema(schema: FeatureSchema) -> Self {
        Self {
            schema: Some(schema),
        }
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.schema.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.schema.is_some()
    }

    /// Expand `table` and record the resulting columns as the schema
    pub fn fit_transform(&mut self, table: &Table) -> Result<Array2<f64>> {
        let (names, values) = expand(table);
        let refs: Vec<&[f64]> = values.iter().map(Vec::as_slice).collect();
        let matrix = to_matrix(&refs, table.height());

        debug!(features = names.len(), rows = table.height(), "Fitted one-hot schema");
        self.schema = Some(FeatureSchema(names));
        Ok(matrix)
    }

    /// Expand `table` independently, then reindex to the fitted schema.
    ///
    /// Schema columns the expansion did not produce are zero-filled and extra
    /// columns are dropped.
    pub fn transform(&self, table: &Table) -> Result<Array2<f64>> {
        let schema = self.schema.as_ref().ok_or(TabularError::ModelNotFitted)?;
        if schema.is_empty() {
            return Err(TabularError::SchemaMismatch(
                "feature schema has no columns".to_string(),
            ));
        }

        let (names, values) = expand(table);
        let mut by_name: HashMap<&str, &[f64]> = HashMap::with_capacity(names.len());
        for (name, col) in names.iter().zip(&values) {
            by_name.entry(name.as_str()).or_insert(col.as_slice());
        }

        let zeros = vec![0.0; table.height()];
        let mut missing = 0usize;
        let aligned: Vec<&[f64]> = schema
            .columns()
            .iter()
            .map(|name| {
                by_name.get(name.as_str()).copied().unwrap_or_else(|| {
                    missing += 1;
                    zeros.as_slice()
                })
            })
            .collect();

        debug!(
            schema_columns = schema.len(),
            zero_filled = missing,
            "Realigned features to schema"
        );
        Ok(to_matrix(&aligned, table.height()))
    }

    /// Realign raw feature records to the fitted schema
    pub fn transform_records(&self, records: &[FeatureRecord]) -> Result<Array2<f64>> {
        let table = table_from_records(records)?;
        self.transform(&table)
    }
}

fn json_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Build a table from feature records.
///
/// Columns are the union of record keys in first-seen order; absent keys are
/// missing. A column is numeric when it has at least one value and every value
/// is a JSON number; otherwise it is categorical.
pub fn table_from_records(records: &[FeatureRecord]) -> Result<Table> {
    let mut keys: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }

    let null = Value::Null;
    let columns = keys
        .into_iter()
        .map(|key| {
            let cells: Vec<&Value> = records
                .iter()
                .map(|r| r.get(key).unwrap_or(&null))
                .collect();
            let present = cells.iter().filter(|v| !v.is_null());
            let is_numeric = present.clone().count() > 0 && present.clone().all(|v| v.is_number());

            if is_numeric {
                Column::numeric(key, cells.iter().map(|v| v.as_f64()))
            } else {
                Column::categorical(key, cells.iter().map(|v| json_to_text(v)))
            }
        })
        .collect();

    Table::new(columns)
}

/// Fit-mode encoding.
///
/// Rows with a missing target are dropped, the target column is removed from
/// the features, and the rest is one-hot expanded.
pub fn encode_for_training(table: &Table, target_column: &str) -> Result<EncodedDataset> {
    let target = table
        .column(target_column)
        .ok_or_else(|| TabularError::TargetColumnMissing(target_column.to_string()))?;

    let keep: Vec<usize> = (0..table.height())
        .filter(|&i| !target.data().is_missing(i))
        .collect();
    let dropped = table.height() - keep.len();
    if dropped > 0 {
        debug!(dropped, "Dropped rows with missing target");
    }

    let feature_columns: Vec<Column> = table
        .columns()
        .iter()
        .filter(|c| c.name() != target_column)
        .map(|c| Column::new(c.name(), c.data().take(&keep)))
        .collect();
    if feature_columns.is_empty() {
        return Err(TabularError::DataError(
            "dataset has no feature columns besides the target".to_string(),
        ));
    }
    let features = Table::new(feature_columns)?;

    let target = match target.data().take(&keep) {
        ColumnData::Numeric(values) => TargetVector::Numeric(values.into_iter().flatten().collect()),
        other => TargetVector::Labels((0..keep.len()).filter_map(|i| other.render(i)).collect()),
    };

    let mut encoder = OneHotEncoder::new();
    let matrix = encoder.fit_transform(&features)?;
    let schema = encoder.schema.unwrap_or_default();

    Ok(EncodedDataset {
        features: matrix,
        schema,
        target,
    })
}

/// Realignment-mode encoding of raw records against a training schema
pub fn encode_for_inference(records: &[FeatureRecord], schema: &FeatureSchema) -> Result<Array2<f64>> {
    OneHotEncoder::from_schema(schema.clone()).transform_records(records)
}
