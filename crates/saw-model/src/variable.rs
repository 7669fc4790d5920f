//! Dataset variables.

use serde::{Deserialize, Serialize};

use crate::ids::VariableId;

/// Data type inferred for a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Numeric,
    Categorical,
    Text,
    Date,
}

impl DataType {
    /// Whether values of both types can be analysed as one scale.
    ///
    /// Numeric and categorical items are both valid Likert encodings.
    pub fn is_compatible_with(self, other: DataType) -> bool {
        self == other
            || matches!(
                (self, other),
                (Self::Numeric, Self::Categorical) | (Self::Categorical, Self::Numeric)
            )
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Numeric => "Numeric",
            Self::Categorical => "Categorical",
            Self::Text => "Text",
            Self::Date => "Date",
        }
    }
}

/// Demographic category of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemographicType {
    Age,
    Gender,
    Education,
    Income,
    Ethnicity,
    Location,
    MaritalStatus,
    Occupation,
    Other,
}

impl DemographicType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::Gender => "Gender",
            Self::Education => "Education",
            Self::Income => "Income",
            Self::Ethnicity => "Ethnicity",
            Self::Location => "Location",
            Self::MaritalStatus => "Marital status",
            Self::Occupation => "Occupation",
            Self::Other => "Other",
        }
    }
}

/// Numeric summary of a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// A single dataset column and everything the workflow learned about it.
///
/// Created once per column at upload time and never deleted while the
/// project lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: VariableId,
    /// Column name exactly as it appears in the header row.
    pub column_name: String,
    pub display_name: String,
    pub semantic_name: Option<String>,
    pub data_type: DataType,
    pub is_demographic: bool,
    pub demographic_type: Option<DemographicType>,
    pub missing_count: usize,
    pub unique_count: usize,
    pub stats: Option<SummaryStats>,
}

impl Variable {
    /// Create a variable with no profile information yet.
    pub fn new(id: VariableId, column_name: impl Into<String>, data_type: DataType) -> Self {
        let column_name = column_name.into();
        Self {
            id,
            display_name: column_name.clone(),
            column_name,
            semantic_name: None,
            data_type,
            is_demographic: false,
            demographic_type: None,
            missing_count: 0,
            unique_count: 0,
            stats: None,
        }
    }

    /// Name used when reasoning about what the variable measures.
    pub fn effective_name(&self) -> &str {
        self.semantic_name.as_deref().unwrap_or(&self.column_name)
    }

    /// Flag the variable as demographic.
    pub fn set_demographic(&mut self, demographic_type: DemographicType) {
        self.is_demographic = true;
        self.demographic_type = Some(demographic_type);
    }

    /// Remove a demographic classification.
    pub fn clear_demographic(&mut self) {
        self.is_demographic = false;
        self.demographic_type = None;
    }
}
