use serde::{Deserialize, Serialize};

/// Semantic type inferred for a raw column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferredType {
    Numeric,
    Date,
    Categorical,
    Text,
    /// Every cell is null.
    Empty,
}

impl InferredType {
    pub fn as_str(self) -> &'static str {
        match self {
            InferredType::Numeric => "numeric",
            InferredType::Date => "date",
            InferredType::Categorical => "categorical",
            InferredType::Text => "text",
            InferredType::Empty => "empty",
        }
    }

    pub fn is_textual(self) -> bool {
        matches!(self, InferredType::Categorical | InferredType::Text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub inferred_type: InferredType,
    pub row_count: usize,
    pub null_count: usize,
    pub null_fraction: f64,
    pub unique_count: usize,
    pub unique_ratio: f64,
    pub sample_values: Vec<String>,
    pub stats: Option<NumericStats>,
}

/// Profiles of every column of one upload, in source column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableProfile {
    pub source: String,
    pub row_count: usize,
    pub columns: Vec<ColumnProfile>,
}

impl TableProfile {
    pub fn get(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
