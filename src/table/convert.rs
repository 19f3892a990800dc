//! Conversion between [`Table`] and polars `DataFrame`

use super::{Column, ColumnData, Table};
use crate::error::Result;
use polars::prelude as pl;
use polars::prelude::{DataType, NamedFrom};

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

impl Table {
    /// Build a table from a polars frame. Numeric dtypes become numeric
    /// columns, everything else is carried as text.
    pub fn from_dataframe(df: &pl::DataFrame) -> Result<Self> {
        let mut columns = Vec::with_capacity(df.width());

        for col in df.get_columns() {
            let name = col.name().to_string();
            let series = col.as_materialized_series();

            // No values to type from: numeric with every cell missing
            let column = if !series.is_empty() && series.null_count() == series.len() {
                Column::numeric(name, vec![None; series.len()])
            } else if is_numeric_dtype(series.dtype()) {
                let cast = series.cast(&DataType::Float64)?;
                Column::numeric(name, cast.f64()?.into_iter())
            } else {
                let cast = series.cast(&DataType::String)?;
                Column::categorical(name, cast.str()?.into_iter())
            };
            columns.push(column);
        }

        Table::new(columns)
    }

    /// Render the table as a polars frame. Temporal cells are written as text.
    pub fn to_dataframe(&self) -> Result<pl::DataFrame> {
        let columns = self
            .columns()
            .iter()
            .map(|c| match c.data() {
                ColumnData::Numeric(values) => pl::Column::new(c.name().into(), values.clone()),
                ColumnData::Categorical(values) => {
                    pl::Column::new(c.name().into(), values.clone())
                }
                ColumnData::Temporal(values) => {
                    let rendered: Vec<Option<String>> = values
                        .iter()
                        .map(|v| v.as_ref().map(ToString::to_string))
                        .collect();
                    pl::Column::new(c.name().into(), rendered)
                }
            })
            .collect::<Vec<_>>();

        Ok(pl::DataFrame::new(columns)?)
    }
}
