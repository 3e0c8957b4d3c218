//! Process-scope map from transform id (`TRn`/`*TRn` card number) to the affine
//! [`Matrix4`] it describes.
//!
//! Grounded on the `TR`/`*TR` card handling referenced throughout
//! `original_source/core/geometry/surfacecreator.hpp`'s constructor
//! (`trMatrixes` parameter) — plain `TRn` direction cosines are consumed as-is, while
//! `*TRn` carries its rotation part in degrees and must be converted before matrix
//! assembly (§6 SUPPLEMENT).

use fxhash::FxHashMap;

use crate::error::{GeomError, Location};
use crate::vecmath::{Matrix4, Point};

/// Parses a `TRn`/`*TRn` card body into a [`Matrix4`].
///
/// `values` holds the card's numeric fields in deck order: translation (3), then
/// optionally a 3x3 rotation matrix (9 more values) in row-major direction-cosine form.
/// A card with only the translation triple yields the identity rotation.
pub fn parse_transform_card(
    id: u32,
    values: &[f64],
    degrees: bool,
    location: Location,
) -> Result<Matrix4, GeomError> {
    if values.len() != 3 && values.len() != 12 {
        return Err(GeomError::InvalidTransform {
            name: format!("TR{id}"),
            location,
            hint: "a transform card needs 3 (translation only) or 12 (translation + rotation) values",
        });
    }
    let translation = Point::new(values[0], values[1], values[2]);
    let rotation = if values.len() == 12 {
        let mut entries = [0.0f64; 9];
        entries.copy_from_slice(&values[3..12]);
        if degrees {
            for e in &mut entries {
                // *TRn gives rotation entries as angles in degrees between the new and
                // old axes; convert to the direction cosine a plain TRn already is.
                *e = e.to_radians().cos();
            }
        }
        nalgebra::Matrix3::from_row_slice(&entries)
    } else {
        nalgebra::Matrix3::identity()
    };
    Ok(Matrix4::from_rotation_translation(rotation, translation))
}

/// All transform cards seen in a deck, keyed by their numeric id.
#[derive(Default)]
pub struct TransformMap {
    matrices: FxHashMap<u32, Matrix4>,
}

impl TransformMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, matrix: Matrix4) {
        self.matrices.insert(id, matrix);
    }

    pub fn get(&self, id: u32) -> Option<&Matrix4> {
        self.matrices.get(&id)
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_only_card_parses() {
        let m = parse_transform_card(1, &[1.0, 2.0, 3.0], false, Location::unknown()).unwrap();
        assert!(crate::vecmath::same_point(
            &m.transform_point(&Point::new(0.0, 0.0, 0.0)),
            &Point::new(1.0, 2.0, 3.0)
        ));
    }

    #[test]
    fn wrong_value_count_is_rejected() {
        let err = parse_transform_card(1, &[1.0, 2.0], false, Location::unknown());
        assert!(matches!(err, Err(GeomError::InvalidTransform { .. })));
    }

    #[test]
    fn degrees_card_converts_to_cosines() {
        let mut values = vec![0.0, 0.0, 0.0];
        values.extend_from_slice(&[0.0, 90.0, 90.0, 90.0, 0.0, 90.0, 90.0, 90.0, 0.0]);
        let m = parse_transform_card(2, &values, true, Location::unknown()).unwrap();
        assert!(m.rotation[(0, 0)].abs() < 1e-9);
    }
}
