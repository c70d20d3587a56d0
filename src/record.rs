//! Structured extraction records and destination categories.

use serde::Deserialize;

/// One structured extraction derived from a scanned document.
///
/// A single scan may yield several of these when multiple receipts share a
/// page. Missing fields decode to their defaults so a sparse model reply
/// still produces a usable record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractedRecord {
    /// Calendar date as printed, YYYY-MM-DD. Empty if the model found none.
    #[serde(default)]
    pub date: String,

    /// Free-text vendor name as printed on the document.
    #[serde(default)]
    pub vendor: String,

    /// Model-supplied category name; mapped onto [`Category`] when filing.
    #[serde(default)]
    pub category: String,

    /// Non-negative total in whole currency units.
    #[serde(default, rename = "total_amount")]
    pub amount: u64,
}

/// Destination categories for filed documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Medical,
    Grocery,
    Tax,
    Utilities,
    Septic,
    Other,
    Unsorted,
}

impl Category {
    /// Directory name under the destination root.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medical => "Medical",
            Self::Grocery => "Grocery",
            Self::Tax => "Tax",
            Self::Utilities => "Utilities",
            Self::Septic => "Septic",
            Self::Other => "Other",
            Self::Unsorted => "Unsorted",
        }
    }

    /// Parse a model-supplied category name. Empty or unrecognized input
    /// files as `Unsorted`.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "medical" => Self::Medical,
            "grocery" | "groceries" => Self::Grocery,
            "tax" | "taxes" => Self::Tax,
            "utilities" | "utility" => Self::Utilities,
            "septic" => Self::Septic,
            "other" => Self::Other,
            _ => Self::Unsorted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_str() {
        assert_eq!(Category::from_str("Grocery"), Category::Grocery);
        assert_eq!(Category::from_str("GROCERY"), Category::Grocery);
        assert_eq!(Category::from_str("utilities"), Category::Utilities);
        assert_eq!(Category::from_str("Septic"), Category::Septic);
        assert_eq!(Category::from_str(""), Category::Unsorted);
        assert_eq!(Category::from_str("snacks"), Category::Unsorted);
    }

    #[test]
    fn test_record_decodes_with_renamed_amount() {
        let record: ExtractedRecord = serde_json::from_str(
            r#"{"date":"2024-01-05","vendor":"ACME","category":"Grocery","total_amount":1200}"#,
        )
        .unwrap();

        assert_eq!(record.date, "2024-01-05");
        assert_eq!(record.vendor, "ACME");
        assert_eq!(record.amount, 1200);
    }

    #[test]
    fn test_record_defaults_missing_fields() {
        let record: ExtractedRecord = serde_json::from_str(r#"{"vendor":"ACME"}"#).unwrap();

        assert_eq!(record.date, "");
        assert_eq!(record.category, "");
        assert_eq!(record.amount, 0);
    }
}
