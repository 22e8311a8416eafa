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

//! Windowed morphological operators (dilation, erosion, closing, opening).
//!
//! Out-of-bounds neighbours are excluded from the window instead of being
//! padded or wrapped around, so every output voxel only ever reads in-bounds
//! input voxels. Output voxels are independent of each other and are computed in
//! parallel on rayon's thread pool.

use ndarray as nd;
use rayon::prelude::*;

use crate::walker::Coord;

/// Shape of the structuring element, parametrised by its radius in voxels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuringElement {
  /// All offsets with `max(|dx|, |dy|, |dz|) <= r`, a `(2r+1)^3` cube
  Cube(usize),
  /// All offsets with `dx² + dy² + dz² <= r²`
  Sphere(usize),
}

impl StructuringElement {
  pub fn radius(&self) -> usize {
    match *self {
      StructuringElement::Cube(r) | StructuringElement::Sphere(r) => r,
    }
  }

  /// Relative offsets covered by the element, the centre included. The set is
  /// point-symmetric, which makes dilation and erosion adjoint.
  pub fn offsets(&self) -> Vec<[isize; 3]> {
    let r = self.radius() as isize;
    let mut offsets = Vec::new();
    for dx in -r..=r {
      for dy in -r..=r {
        for dz in -r..=r {
          let inside = match self {
            StructuringElement::Cube(_) => true,
            StructuringElement::Sphere(_) => dx * dx + dy * dy + dz * dz <= r * r,
          };
          if inside {
            offsets.push([dx, dy, dz]);
          }
        }
      }
    }
    offsets
  }
}

#[inline]
fn window_reduce<T, F>(data: &nd::ArrayView3<T>, p: Coord, offsets: &[[isize; 3]], pick: &F) -> T
where
  T: Copy,
  F: Fn(T, T) -> T,
{
  let (nx, ny, nz) = data.dim();
  let shape = [nx as isize, ny as isize, nz as isize];
  //The centre is always part of the window, so the fold has a valid start
  offsets
    .iter()
    .filter_map(|off| {
      let q = [p[0] as isize + off[0], p[1] as isize + off[1], p[2] as isize + off[2]];
      if (0..3).all(|ax| q[ax] >= 0 && q[ax] < shape[ax]) {
        Some(data[[q[0] as usize, q[1] as usize, q[2] as usize]])
      } else {
        None
      }
    })
    .fold(data[p], pick)
}

fn windowed<T, F>(data: nd::ArrayView3<T>, se: StructuringElement, pick: F) -> nd::Array3<T>
where
  T: Copy + Send + Sync,
  F: Fn(T, T) -> T + Send + Sync,
{
  let offsets = se.offsets();
  let mut out = data.to_owned();
  if se.radius() == 0 {
    return out;
  }
  nd::Zip::indexed(out.view_mut())
    .par_for_each(|(i, j, k), px| *px = window_reduce(&data, [i, j, k], &offsets, &pick));
  out
}

/// Greyscale dilation: every voxel becomes the maximum of its window. For
/// `bool` masks this is the logical OR.
pub fn morph_dilate<T>(data: nd::ArrayView3<T>, se: StructuringElement) -> nd::Array3<T>
where
  T: PartialOrd + Copy + Send + Sync,
{
  windowed(data, se, |acc, v| if v > acc { v } else { acc })
}

/// Greyscale erosion: every voxel becomes the minimum of its window. For
/// `bool` masks this is the logical AND.
pub fn morph_erode<T>(data: nd::ArrayView3<T>, se: StructuringElement) -> nd::Array3<T>
where
  T: PartialOrd + Copy + Send + Sync,
{
  windowed(data, se, |acc, v| if v < acc { v } else { acc })
}

/// Closing (dilation followed by erosion). Fills gaps smaller than the
/// structuring element, for instance in nucleus marker masks. Idempotent.
pub fn morph_close<T>(data: nd::ArrayView3<T>, se: StructuringElement) -> nd::Array3<T>
where
  T: PartialOrd + Copy + Send + Sync,
{
  let dilated = morph_dilate(data, se);
  morph_erode(dilated.view(), se)
}

/// Opening (erosion followed by dilation). Removes foreground specks smaller
/// than the structuring element. Idempotent.
pub fn morph_open<T>(data: nd::ArrayView3<T>, se: StructuringElement) -> nd::Array3<T>
where
  T: PartialOrd + Copy + Send + Sync,
{
  let eroded = morph_erode(data, se);
  morph_dilate(eroded.view(), se)
}

/// Thresholds a grey value volume into a foreground mask (`value > thresh`)
pub fn threshold<T>(data: nd::ArrayView3<T>, thresh: T) -> nd::Array3<bool>
where
  T: PartialOrd + Copy + Send + Sync,
{
  let mut mask = nd::Array3::from_elem(data.raw_dim(), false);
  nd::Zip::from(&mut mask).and(&data).par_for_each(|m, &v| *m = v > thresh);
  mask
}

/// Counts the voxels set in a mask, using per-thread partial sums
pub fn count_foreground(mask: nd::ArrayView3<bool>) -> usize {
  mask.into_par_iter().filter(|&&m| m).count()
}
