//! Scalar attributes attached to dataset elements

use crate::data::dataset::DataSet;

/// Which dataset elements an attribute's values belong to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldAssociation {
    Points,
    Cells,
}

/// A named scalar attribute with one value per associated element
#[derive(Clone, Debug)]
pub struct ScalarAttribute {
    name: String,
    association: FieldAssociation,
    values: Vec<f64>,
}

impl ScalarAttribute {
    pub fn new(name: impl Into<String>, association: FieldAssociation, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            association,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn association(&self) -> FieldAssociation {
        self.association
    }

    pub fn value(&self, i: usize) -> f64 {
        self.values[i]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the value count matches the associated element count
    pub fn matches(&self, dataset: &DataSet) -> bool {
        let expected = match self.association {
            FieldAssociation::Points => dataset.n_points(),
            FieldAssociation::Cells => dataset.n_cells(),
        };
        self.values.len() == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DVec3;

    #[test]
    fn test_matches() {
        let ds = DataSet::from_points(vec![DVec3::ZERO, DVec3::ONE]);
        let good = ScalarAttribute::new("rho", FieldAssociation::Points, vec![1.0, 2.0]);
        let bad = ScalarAttribute::new("rho", FieldAssociation::Points, vec![1.0]);
        assert!(good.matches(&ds));
        assert!(!bad.matches(&ds));
    }
}
