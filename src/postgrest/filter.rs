//! Filter operations for PostgrestClient

/// A single column equality filter, rendered as `column=eq.value`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// The filtered column
    pub column: String,

    /// The already formatted operand
    pub value: String,
}

impl Filter {
    /// Filter rows where `column` equals `value`
    pub fn eq(column: &str, value: impl ToString) -> Self {
        Self {
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    /// The query parameter pair for this filter
    pub fn to_param(&self) -> (String, String) {
        (self.column.clone(), format!("eq.{}", self.value))
    }
}
