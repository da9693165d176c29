//! Two-level encoding of a binary covariate.

use crate::data::{Metadata, Variable};
use crate::error::{Cardinality, DaaError, Result};

/// Maps the two levels of a covariate onto signed tokens.
///
/// The first level seen in metadata row order maps to `-1`, the second to
/// `+1`. The reference is the first level unless a label names the other.
#[derive(Debug, Clone, PartialEq)]
pub struct CovariateEncoding {
    levels: [Variable; 2],
    reference: usize,
}

impl CovariateEncoding {
    /// Build the encoding for `column`, validating that it has exactly two levels.
    pub fn from_metadata(
        metadata: &Metadata,
        column: &str,
        reference: Option<&str>,
    ) -> Result<Self> {
        let distinct = metadata.distinct_values(column)?;
        let levels = match distinct.as_slice() {
            [first, second] => [(*first).clone(), (*second).clone()],
            _ if distinct.len() < 2 => {
                return Err(DaaError::CategoryCardinality {
                    kind: Cardinality::TooFew,
                    found: distinct.len(),
                })
            }
            _ => {
                return Err(DaaError::CategoryCardinality {
                    kind: Cardinality::TooMany,
                    found: distinct.len(),
                })
            }
        };

        let reference = match reference {
            None => 0,
            Some(label) => levels
                .iter()
                .position(|level| level.matches_label(label))
                .ok_or_else(|| DaaError::UnknownReference {
                    column: column.to_string(),
                    reference: label.to_string(),
                })?,
        };

        Ok(Self { levels, reference })
    }

    /// Signed token of a value, or `None` if it is neither level.
    pub fn sign(&self, value: &Variable) -> Option<i8> {
        if value == &self.levels[0] {
            Some(-1)
        } else if value == &self.levels[1] {
            Some(1)
        } else {
            None
        }
    }

    /// Signed token of the reference level.
    pub fn reference_sign(&self) -> i8 {
        if self.reference == 0 {
            -1
        } else {
            1
        }
    }

    /// Whether a value belongs to the reference group.
    pub fn is_reference(&self, value: &Variable) -> Option<bool> {
        self.sign(value).map(|s| s == self.reference_sign())
    }

    /// The reference level.
    pub fn reference_level(&self) -> &Variable {
        &self.levels[self.reference]
    }

    /// The non-reference level.
    pub fn other_level(&self) -> &Variable {
        &self.levels[1 - self.reference]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(values: &[&str]) -> Metadata {
        Metadata::from_column(
            "group",
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("S{}", i), *v)),
        )
        .unwrap()
    }

    #[test]
    fn test_first_appearance_order() {
        let enc = CovariateEncoding::from_metadata(&meta(&["b", "a", "b"]), "group", None).unwrap();
        assert_eq!(enc.sign(&Variable::from("b")), Some(-1));
        assert_eq!(enc.sign(&Variable::from("a")), Some(1));
        assert_eq!(enc.sign(&Variable::from("c")), None);
        assert_eq!(enc.reference_level(), &Variable::from("b"));
        assert_eq!(enc.reference_sign(), -1);
    }

    #[test]
    fn test_explicit_reference() {
        let enc =
            CovariateEncoding::from_metadata(&meta(&["b", "a", "b"]), "group", Some("a")).unwrap();
        assert_eq!(enc.reference_sign(), 1);
        assert_eq!(enc.is_reference(&Variable::from("a")), Some(true));
        assert_eq!(enc.is_reference(&Variable::from("b")), Some(false));
        assert_eq!(enc.other_level(), &Variable::from("b"));
    }

    #[test]
    fn test_unknown_reference() {
        let err = CovariateEncoding::from_metadata(&meta(&["b", "a"]), "group", Some("z"))
            .unwrap_err();
        assert!(matches!(err, DaaError::UnknownReference { .. }));
    }

    #[test]
    fn test_cardinality() {
        let err = CovariateEncoding::from_metadata(&meta(&["a", "a"]), "group", None).unwrap_err();
        assert!(matches!(
            err,
            DaaError::CategoryCardinality {
                kind: Cardinality::TooFew,
                found: 1
            }
        ));

        let err =
            CovariateEncoding::from_metadata(&meta(&["a", "b", "c"]), "group", None).unwrap_err();
        assert!(matches!(
            err,
            DaaError::CategoryCardinality {
                kind: Cardinality::TooMany,
                found: 3
            }
        ));
    }

    #[test]
    fn test_numeric_reference_label() {
        let meta = Metadata::from_column(
            "label",
            vec![("S0".to_string(), 1.0), ("S1".to_string(), -1.0)],
        )
        .unwrap();
        let enc = CovariateEncoding::from_metadata(&meta, "label", Some("-1")).unwrap();
        assert_eq!(enc.reference_level(), &Variable::Continuous(-1.0));
        assert_eq!(enc.reference_sign(), 1);
    }
}
