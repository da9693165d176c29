//! Sample metadata handling for differential abundance analysis.

use crate::error::{DaaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Categorical variable with a string level.
    Categorical(String),
    /// Continuous numeric variable.
    Continuous(f64),
    /// Missing value.
    Missing,
}

impl Variable {
    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Variable::Missing)
    }

    /// Try to get as categorical string.
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Variable::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as continuous f64.
    pub fn as_continuous(&self) -> Option<f64> {
        match self {
            Variable::Continuous(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether a user-supplied label names this value.
    ///
    /// Numeric values also match labels that parse to the same number,
    /// so `"1"`, `"1.0"` and `"1e0"` all name `Continuous(1.0)`.
    pub fn matches_label(&self, label: &str) -> bool {
        let label = label.trim();
        match self {
            Variable::Categorical(s) => s == label,
            Variable::Continuous(v) => label.parse::<f64>().map(|l| l == *v).unwrap_or(false),
            Variable::Missing => is_missing_token(label),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Categorical(s) => write!(f, "{}", s),
            Variable::Continuous(v) => write!(f, "{}", v),
            Variable::Missing => write!(f, "NA"),
        }
    }
}

impl From<&str> for Variable {
    fn from(s: &str) -> Self {
        Variable::Categorical(s.to_string())
    }
}

impl From<f64> for Variable {
    fn from(v: f64) -> Self {
        if v.is_nan() {
            Variable::Missing
        } else {
            Variable::Continuous(v)
        }
    }
}

/// Column type, inferred when loading metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Categorical,
    Continuous,
}

fn is_missing_token(raw: &str) -> bool {
    raw.is_empty() || raw == "NA" || raw == "na" || raw.eq_ignore_ascii_case("nan")
}

/// Sample metadata containing variables for each sample.
///
/// Sample order is the row order of the source and is preserved by every
/// operation; it defines the first-appearance order of covariate levels.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Sample IDs in order.
    sample_ids: Vec<String>,
    /// Column names.
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> Variable.
    data: HashMap<String, HashMap<String, Variable>>,
    /// Type of each column.
    column_types: HashMap<String, VariableType>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self {
            sample_ids: Vec::new(),
            column_names: Vec::new(),
            data: HashMap::new(),
            column_types: HashMap::new(),
        }
    }

    /// Build metadata holding a single column.
    pub fn from_column<V: Into<Variable>>(
        column: &str,
        samples: impl IntoIterator<Item = (String, V)>,
    ) -> Result<Self> {
        let (sample_ids, values): (Vec<String>, Vec<Variable>) =
            samples.into_iter().map(|(s, v)| (s, v.into())).unzip();
        let mut meta = Self::new();
        for sid in &sample_ids {
            if meta.data.contains_key(sid) {
                return Err(DaaError::InvalidParameter(format!(
                    "Duplicate sample ID '{}' in metadata",
                    sid
                )));
            }
            meta.data.insert(sid.clone(), HashMap::new());
        }
        meta.sample_ids = sample_ids;
        meta.with_column(column, values)
    }

    /// Add (or replace) a column, one value per sample in sample order.
    pub fn with_column(mut self, column: &str, values: Vec<Variable>) -> Result<Self> {
        if values.len() != self.sample_ids.len() {
            return Err(DaaError::DimensionMismatch {
                expected: self.sample_ids.len(),
                actual: values.len(),
            });
        }
        let var_type = if values
            .iter()
            .all(|v| matches!(v, Variable::Continuous(_) | Variable::Missing))
        {
            VariableType::Continuous
        } else {
            VariableType::Categorical
        };
        for (sid, value) in self.sample_ids.iter().zip(values) {
            let value = match value {
                Variable::Continuous(v) if v.is_nan() => Variable::Missing,
                other => other,
            };
            if let Some(row) = self.data.get_mut(sid) {
                row.insert(column.to_string(), value);
            }
        }
        if !self.has_column(column) {
            self.column_names.push(column.to_string());
        }
        self.column_types.insert(column.to_string(), var_type);
        Ok(self)
    }

    /// Load metadata from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with column names (first column is sample ID)
    /// - Subsequent rows: sample ID followed by variable values
    ///
    /// Columns are inferred as continuous if all values parse as numbers,
    /// otherwise categorical. `NA`, `NaN` and empty cells are missing.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| DaaError::EmptyData("Empty metadata file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(DaaError::EmptyData(
                "Metadata must have at least one variable column".to_string(),
            ));
        }
        let column_names: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();

        // First pass: collect raw values to infer types
        let mut raw_data: Vec<(String, Vec<String>)> = Vec::new();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let sample_id = fields[0].trim().to_string();
            let values: Vec<String> = fields[1..].iter().map(|s| s.trim().to_string()).collect();
            raw_data.push((sample_id, values));
        }

        if raw_data.is_empty() {
            return Err(DaaError::EmptyData("No samples in metadata".to_string()));
        }

        let mut column_types = HashMap::new();
        for (col_idx, col_name) in column_names.iter().enumerate() {
            let all_numeric = raw_data.iter().all(|(_, values)| match values.get(col_idx) {
                None => true,
                Some(v) => is_missing_token(v) || v.parse::<f64>().is_ok(),
            });
            let var_type = if all_numeric {
                VariableType::Continuous
            } else {
                VariableType::Categorical
            };
            column_types.insert(col_name.clone(), var_type);
        }

        let mut sample_ids = Vec::with_capacity(raw_data.len());
        let mut data = HashMap::with_capacity(raw_data.len());

        for (sample_id, values) in raw_data {
            if data.contains_key(&sample_id) {
                return Err(DaaError::InvalidParameter(format!(
                    "Duplicate sample ID '{}' in metadata",
                    sample_id
                )));
            }
            let mut sample_data = HashMap::new();
            for (col_idx, col_name) in column_names.iter().enumerate() {
                let var = match values.get(col_idx) {
                    None => Variable::Missing,
                    Some(raw) if is_missing_token(raw) => Variable::Missing,
                    Some(raw) => match column_types.get(col_name) {
                        Some(VariableType::Continuous) => raw
                            .parse::<f64>()
                            .map(Variable::Continuous)
                            .unwrap_or(Variable::Missing),
                        Some(VariableType::Categorical) | None => {
                            Variable::Categorical(raw.clone())
                        }
                    },
                };
                sample_data.insert(col_name.clone(), var);
            }
            sample_ids.push(sample_id.clone());
            data.insert(sample_id, sample_data);
        }

        Ok(Self {
            sample_ids,
            column_names,
            data,
            column_types,
        })
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get a variable value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Get all values for a column, in sample order.
    pub fn column(&self, column: &str) -> Result<Vec<&Variable>> {
        if !self.has_column(column) {
            return Err(DaaError::MissingColumn(column.to_string()));
        }
        Ok(self
            .sample_ids
            .iter()
            .map(|sid| self.get(sid, column).unwrap_or(&Variable::Missing))
            .collect())
    }

    /// Get the type of a column.
    pub fn column_type(&self, column: &str) -> Option<VariableType> {
        self.column_types.get(column).copied()
    }

    /// Distinct values of a column in order of first appearance.
    pub fn distinct_values(&self, column: &str) -> Result<Vec<&Variable>> {
        let mut distinct: Vec<&Variable> = Vec::new();
        for value in self.column(column)? {
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }
        Ok(distinct)
    }

    /// Subset metadata to the specified samples, in the given order.
    pub fn subset_samples(&self, sample_ids: &[String]) -> Result<Self> {
        let mut new_data = HashMap::with_capacity(sample_ids.len());
        let mut new_sample_ids = Vec::with_capacity(sample_ids.len());

        for sid in sample_ids {
            match self.data.get(sid) {
                Some(sample_data) => {
                    new_data.insert(sid.clone(), sample_data.clone());
                    new_sample_ids.push(sid.clone());
                }
                None => {
                    return Err(DaaError::SampleMismatch(format!(
                        "sample '{}' not found in metadata",
                        sid
                    )))
                }
            }
        }

        Ok(Self {
            sample_ids: new_sample_ids,
            column_names: self.column_names.clone(),
            data: new_data,
            column_types: self.column_types.clone(),
        })
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}
