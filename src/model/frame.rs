use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("unsupported input shape: {0}")]
    UnsupportedShape(String),
    #[error("row {row} has {found} values but {expected} columns were declared")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("column '{column}' has {found} values, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("missing required column '{0}'")]
    MissingColumn(String),
    #[error("row {row} has {found} values, model expects {expected} features")]
    FeatureCount {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("prediction for row {row} is not finite")]
    NonFinitePrediction { row: usize },
    #[error("non-numeric value for '{column}' in row {row}: {value}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },
}

/// Tabular view of a request body.
///
/// `columns` is `None` for positional input (bare rows), in which case values
/// are matched to model features by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Option<Vec<String>>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn from_json(value: Value) -> Result<Self, FrameError> {
        match value {
            Value::Array(items) => Self::from_items(items),
            Value::Object(mut map) => {
                if let Some(split) = map.remove("dataframe_split") {
                    return Self::from_split(split);
                }
                if let Some(records) = map.remove("dataframe_records") {
                    return match records {
                        Value::Array(items) => Self::from_records(items),
                        other => Err(FrameError::UnsupportedShape(format!(
                            "'dataframe_records' must be an array, got {}",
                            kind(&other)
                        ))),
                    };
                }
                for key in ["instances", "inputs"] {
                    if let Some(inner) = map.remove(key) {
                        return match inner {
                            Value::Array(items) => Self::from_items(items),
                            Value::Object(columns) => Self::from_columns(columns),
                            other => Err(FrameError::UnsupportedShape(format!(
                                "'{key}' must be an array or object, got {}",
                                kind(&other)
                            ))),
                        };
                    }
                }
                if map.contains_key("columns") && map.contains_key("data") {
                    return Self::from_split(Value::Object(map));
                }
                Self::from_object(map)
            }
            other => Err(FrameError::UnsupportedShape(format!(
                "expected a JSON object or array, got {}",
                kind(&other)
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Projects the frame onto `features`, in that order, as a dense numeric matrix.
    pub fn to_matrix(&self, features: &[String]) -> Result<Vec<Vec<f64>>, FrameError> {
        match &self.columns {
            Some(columns) => {
                let indices = features
                    .iter()
                    .map(|feature| {
                        columns
                            .iter()
                            .position(|column| column == feature)
                            .ok_or_else(|| FrameError::MissingColumn(feature.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                self.rows
                    .iter()
                    .enumerate()
                    .map(|(row_idx, row)| {
                        indices
                            .iter()
                            .zip(features)
                            .map(|(&col_idx, feature)| numeric(&row[col_idx], feature, row_idx))
                            .collect::<Result<Vec<f64>, FrameError>>()
                    })
                    .collect()
            }
            None => self
                .rows
                .iter()
                .enumerate()
                .map(|(row_idx, row)| {
                    if row.len() != features.len() {
                        return Err(FrameError::FeatureCount {
                            row: row_idx,
                            expected: features.len(),
                            found: row.len(),
                        });
                    }
                    row.iter()
                        .zip(features)
                        .map(|(value, feature)| numeric(value, feature, row_idx))
                        .collect::<Result<Vec<f64>, FrameError>>()
                })
                .collect(),
        }
    }

    fn from_items(items: Vec<Value>) -> Result<Self, FrameError> {
        if items.is_empty() {
            return Ok(Self {
                columns: None,
                rows: Vec::new(),
            });
        }
        if items.iter().all(Value::is_object) {
            return Self::from_records(items);
        }
        if items.iter().all(Value::is_array) {
            let rows = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Array(values) => Some(values),
                    _ => None,
                })
                .collect();
            return Ok(Self {
                columns: None,
                rows,
            });
        }
        if items.iter().all(is_scalar) {
            let rows = items.into_iter().map(|value| vec![value]).collect();
            return Ok(Self {
                columns: None,
                rows,
            });
        }
        Err(FrameError::UnsupportedShape(
            "array elements must all be records, all rows, or all scalars".into(),
        ))
    }

    fn from_records(items: Vec<Value>) -> Result<Self, FrameError> {
        if items.is_empty() {
            return Ok(Self {
                columns: None,
                rows: Vec::new(),
            });
        }
        let mut columns: Vec<String> = Vec::new();
        let mut records = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            let record = match item {
                Value::Object(record) => record,
                other => {
                    return Err(FrameError::UnsupportedShape(format!(
                        "record {idx} is {}, expected an object",
                        kind(&other)
                    )));
                }
            };
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
            records.push(record);
        }

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|column| record.remove(column).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self {
            columns: Some(columns),
            rows,
        })
    }

    fn from_split(value: Value) -> Result<Self, FrameError> {
        let mut split = match value {
            Value::Object(split) => split,
            _ => {
                return Err(FrameError::UnsupportedShape(
                    "split-oriented input must be an object with 'columns' and 'data'".into(),
                ));
            }
        };

        let columns = match split.remove("columns") {
            Some(Value::Array(names)) => Some(
                names
                    .into_iter()
                    .map(|name| match name {
                        Value::String(s) => Ok(s),
                        other => Err(FrameError::UnsupportedShape(format!(
                            "column names must be strings, got {}",
                            kind(&other)
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(other) => {
                return Err(FrameError::UnsupportedShape(format!(
                    "'columns' must be an array, got {}",
                    kind(&other)
                )));
            }
            None => None,
        };

        let data = match split.remove("data") {
            Some(Value::Array(rows)) => rows,
            Some(other) => {
                return Err(FrameError::UnsupportedShape(format!(
                    "'data' must be an array of rows, got {}",
                    kind(&other)
                )));
            }
            None => {
                return Err(FrameError::UnsupportedShape(
                    "split-oriented input requires 'data'".into(),
                ));
            }
        };

        let mut rows = Vec::with_capacity(data.len());
        for (row_idx, row) in data.into_iter().enumerate() {
            let values = match row {
                Value::Array(values) => values,
                other => {
                    return Err(FrameError::UnsupportedShape(format!(
                        "row {row_idx} is {}, expected an array",
                        kind(&other)
                    )));
                }
            };
            if let Some(columns) = &columns {
                if values.len() != columns.len() {
                    return Err(FrameError::RaggedRow {
                        row: row_idx,
                        expected: columns.len(),
                        found: values.len(),
                    });
                }
            }
            rows.push(values);
        }

        Ok(Self { columns, rows })
    }

    fn from_object(map: Map<String, Value>) -> Result<Self, FrameError> {
        if !map.is_empty() && map.values().all(is_scalar) {
            return Self::from_records(vec![Value::Object(map)]);
        }
        Self::from_columns(map)
    }

    fn from_columns(map: Map<String, Value>) -> Result<Self, FrameError> {
        let mut columns = Vec::with_capacity(map.len());
        let mut series = Vec::with_capacity(map.len());
        for (name, values) in map {
            let values = match values {
                Value::Array(values) => values,
                other => {
                    return Err(FrameError::UnsupportedShape(format!(
                        "column '{name}' must be an array of values, got {}",
                        kind(&other)
                    )));
                }
            };
            columns.push(name);
            series.push(values);
        }

        let height = series.first().map(Vec::len).unwrap_or(0);
        for (name, values) in columns.iter().zip(&series) {
            if values.len() != height {
                return Err(FrameError::RaggedColumn {
                    column: name.clone(),
                    expected: height,
                    found: values.len(),
                });
            }
        }

        let mut rows: Vec<Vec<Value>> = (0..height)
            .map(|_| Vec::with_capacity(columns.len()))
            .collect();
        for values in series {
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
        }

        Ok(Self {
            columns: Some(columns),
            rows,
        })
    }
}

fn numeric(value: &Value, column: &str, row: usize) -> Result<f64, FrameError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.ok_or_else(|| FrameError::NonNumeric {
        column: column.to_string(),
        row,
        value: value.to_string(),
    })
}

fn is_scalar(value: &Value) -> bool {
    !(value.is_array() || value.is_object())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
