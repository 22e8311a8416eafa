/*
  Copyright© 2023 Raúl Wolters(1)

  This file is part of irocs-morph.

  irocs-morph is free software: you can redistribute it and/or modify it under
  the terms of the European Union Public License version 1.2 or later, as
  published by the European Commission.

  irocs-morph is distributed in the hope that it will be useful, but WITHOUT ANY
  WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
  A PARTICULAR PURPOSE. See the European Union Public License for more details.

  You should have received a copy of the EUPL in an/all official language(s) of
  the European Union along with irocs-morph.  If not, see
  <https://ec.europa.eu/info/european-union-public-licence_en/>.

  (1) Resident of the Kingdom of the Netherlands; agreement between licensor and
  licensee subject to Dutch law as per article 15 of the EUPL.
*/

//! Error types shared by all algorithms in this crate.

use thiserror::Error;

/// Precondition violations reported by the morphology and watershed routines.
///
/// Degenerate inputs (no markers, empty volumes, unreachable regions) are not
/// errors: they produce well-defined all-zero or partial output instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MorphError {
  /// Two arrays that have to be voxel-aligned have different shapes
  #[error("shape mismatch: {what} has shape {actual:?}, expected {expected:?}")]
  ShapeMismatch { what: &'static str, expected: [usize; 3], actual: [usize; 3] },

  /// Connectivity other than 6, 18 or 26
  #[error("invalid connectivity {0}: expected 6, 18 or 26")]
  InvalidConnectivity(u32),

  /// Height field contains a value that cannot be ordered (NaN)
  #[error("height value at {0:?} is not comparable (NaN)")]
  InvalidHeight([usize; 3]),

  /// A marker already carries the reserved boundary label
  #[error("marker at {0:?} carries the reserved boundary label")]
  SentinelInMarker([usize; 3]),

  /// More regions than the label type can represent
  #[error("label overflow: {0} regions do not fit in the requested label type")]
  LabelOverflow(usize),

  /// Invalid builder or function parameter
  #[error("invalid parameter: {0}")]
  InvalidParameter(String),
}

/// Result type for morphology operations
pub type MorphResult<T> = Result<T, MorphError>;

/// Fails with `ShapeMismatch` unless both shapes are equal
pub(crate) fn check_shape(
  what: &'static str,
  expected: &[usize],
  actual: &[usize],
) -> MorphResult<()> {
  if expected == actual {
    Ok(())
  } else {
    Err(MorphError::ShapeMismatch { what, expected: to_shape(expected), actual: to_shape(actual) })
  }
}

#[inline]
pub(crate) fn to_shape(dim: &[usize]) -> [usize; 3] {
  let mut shape = [0; 3];
  dim.iter().zip(shape.iter_mut()).for_each(|(&d, s)| *s = d);
  shape
}
