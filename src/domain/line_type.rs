use serde::{Deserialize, Serialize};

use crate::domain::ids::{IdAllocator, LineTypeId};
use crate::error::{Error, Result};

/// Named cable specification. The rating is the current-carrying capacity;
/// any number of lines may share one type. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineType {
    id: LineTypeId,
    name: String,
    rating: f64,
}

impl LineType {
    /// Build a line type. The name must be a non-empty alphanumeric
    /// identifier; the rating must be finite and non-negative.
    pub fn new(ids: &IdAllocator, name: impl Into<String>, rating: f64) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::Range(format!(
                "line type name must be non-empty and alphanumeric, got {name:?}"
            )));
        }
        if !rating.is_finite() || rating < 0.0 {
            return Err(Error::Range(format!(
                "line type rating must be non-negative, got {rating}"
            )));
        }
        Ok(Self {
            id: ids.next_line_type(),
            name,
            rating,
        })
    }

    pub fn id(&self) -> LineTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn sanity() {
        let ids = IdAllocator::new();
        let cool = LineType::new(&ids, "CoolType", 1000.0).unwrap();
        assert_eq!(cool.name(), "CoolType");
        assert_eq!(cool.rating(), 1000.0);
    }

    #[rstest]
    #[case("")]
    #[case("Stupid Type")]
    #[case("hy-phen")]
    #[case("semi;colon")]
    fn rejects_bad_names(#[case] name: &str) {
        let ids = IdAllocator::new();
        assert!(matches!(
            LineType::new(&ids, name, 100.0),
            Err(Error::Range(_))
        ));
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::NEG_INFINITY)]
    fn rejects_bad_ratings(#[case] rating: f64) {
        let ids = IdAllocator::new();
        assert!(LineType::new(&ids, "TypeA", rating).is_err());
    }

    #[test]
    fn zero_rating_is_allowed() {
        let ids = IdAllocator::new();
        assert!(LineType::new(&ids, "Unrated", 0.0).is_ok());
    }
}
