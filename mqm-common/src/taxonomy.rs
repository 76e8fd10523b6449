//! MQM error category tree
//!
//! Fixed two-level taxonomy offered to operators. `No-error` and
//! `Non-translation` are classification sentinels and never label a span.

use serde::Serialize;

use crate::models::ErrorCategory;
use crate::{Error, Result};

pub const NO_ERROR: &str = "No-error";
pub const NON_TRANSLATION: &str = "Non-translation";

/// One top-level category with its allowed subcategories
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CategoryDef {
    pub name: &'static str,
    pub subcategories: &'static [&'static str],
    /// True for the sentinel entries set through the mark operations
    pub sentinel: bool,
}

const CATEGORIES: &[CategoryDef] = &[
    CategoryDef {
        name: NO_ERROR,
        subcategories: &[],
        sentinel: true,
    },
    CategoryDef {
        name: "Accuracy",
        subcategories: &["Mistranslation", "Addition", "Omission", "Other"],
        sentinel: false,
    },
    CategoryDef {
        name: "Fluency",
        subcategories: &[
            "Grammar",
            "Spelling",
            "Punctuation",
            "Inconsistency",
            "Register",
            "Other",
        ],
        sentinel: false,
    },
    CategoryDef {
        name: "Terminology",
        subcategories: &["Inappropriate", "Inconsistent", "Other"],
        sentinel: false,
    },
    CategoryDef {
        name: "Style",
        subcategories: &["Awkward", "Other"],
        sentinel: false,
    },
    CategoryDef {
        name: "Locale",
        subcategories: &[
            "Currency format",
            "Time format",
            "Name format",
            "Date format",
            "Address format",
            "Other",
        ],
        sentinel: false,
    },
    CategoryDef {
        name: NON_TRANSLATION,
        subcategories: &[],
        sentinel: true,
    },
];

/// All categories in display order
pub fn categories() -> &'static [CategoryDef] {
    CATEGORIES
}

/// Look up a top-level category by exact name
pub fn find(name: &str) -> Option<&'static CategoryDef> {
    CATEGORIES.iter().find(|c| c.name == name)
}

/// Validate an operator-supplied label for a manual span
///
/// A missing subcategory falls back to the category's first entry, the
/// same default the selection widget shows. Blank `other` text is dropped.
pub fn validate(label: ErrorCategory) -> Result<ErrorCategory> {
    let def = find(label.category.trim()).ok_or_else(|| {
        Error::InvalidInput(format!("Unknown error category: {}", label.category))
    })?;

    if def.sentinel {
        return Err(Error::InvalidInput(format!(
            "\"{}\" is an item classification, not a span category",
            def.name
        )));
    }

    let subcategory = match label.subcategory.as_deref().map(str::trim) {
        Some(sub) if !sub.is_empty() => {
            if !def.subcategories.contains(&sub) {
                return Err(Error::InvalidInput(format!(
                    "Subcategory \"{}\" does not belong to {}",
                    sub, def.name
                )));
            }
            Some(sub.to_string())
        }
        _ => def.subcategories.first().map(|s| s.to_string()),
    };

    let other = label
        .other
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty());

    Ok(ErrorCategory {
        category: def.name.to_string(),
        subcategory,
        other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_matches_selector() {
        let names: Vec<_> = categories().iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "No-error",
                "Accuracy",
                "Fluency",
                "Terminology",
                "Style",
                "Locale",
                "Non-translation"
            ]
        );
    }

    #[test]
    fn test_validate_accepts_known_pair() {
        let cat = validate(ErrorCategory::new("Fluency").with_subcategory("Grammar")).unwrap();
        assert_eq!(cat.label(), "Fluency/Grammar");
    }

    #[test]
    fn test_validate_defaults_subcategory() {
        let cat = validate(ErrorCategory::new("Locale")).unwrap();
        assert_eq!(cat.subcategory.as_deref(), Some("Currency format"));
    }

    #[test]
    fn test_validate_rejects_foreign_subcategory() {
        let err = validate(ErrorCategory::new("Style").with_subcategory("Grammar")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_validate_rejects_unknown_category() {
        assert!(validate(ErrorCategory::new("Vibes")).is_err());
    }

    #[test]
    fn test_validate_rejects_sentinels() {
        assert!(validate(ErrorCategory::new(NO_ERROR)).is_err());
        assert!(validate(ErrorCategory::new(NON_TRANSLATION)).is_err());
    }

    #[test]
    fn test_validate_trims_other() {
        let cat = validate(
            ErrorCategory::new("Accuracy")
                .with_subcategory("Other")
                .with_other("  tone shift "),
        )
        .unwrap();
        assert_eq!(cat.other.as_deref(), Some("tone shift"));

        let blank = validate(ErrorCategory::new("Accuracy").with_other("   ")).unwrap();
        assert!(blank.other.is_none());
    }
}
