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

//! Integer label types and the reserved label values.

use num_traits::{AsPrimitive, NumCast, PrimInt, Unsigned};

use crate::error::{MorphError, MorphResult};

/// Element type of a label field: any unsigned primitive integer.
///
/// `0` means unknown (or background), `Label::max_value()` is reserved for
/// watershed boundary voxels and every value in between identifies a region.
/// Narrow types like `u16` save memory on large volumes, at the cost of
/// supporting fewer regions.
pub trait Label:
  PrimInt + Unsigned + AsPrimitive<usize> + Send + Sync + std::fmt::Debug + std::hash::Hash
{
}

impl<L> Label for L where
  L: PrimInt + Unsigned + AsPrimitive<usize> + Send + Sync + std::fmt::Debug + std::hash::Hash
{
}

/// The boundary sentinel for label type `L`
#[inline(always)]
pub fn boundary_label<L: Label>() -> L {
  L::max_value()
}

/// Returns true for labels that identify a region (neither unknown nor boundary)
#[inline(always)]
pub fn is_region<L: Label>(l: L) -> bool {
  l != L::zero() && l != L::max_value()
}

/// Converts a region id into `L`, failing if it collides with the sentinel or
/// does not fit at all
#[inline]
pub(crate) fn region_label<L: Label>(id: usize) -> MorphResult<L> {
  match <L as NumCast>::from(id) {
    Some(l) if l != boundary_label::<L>() => Ok(l),
    _ => Err(MorphError::LabelOverflow(id)),
  }
}
