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

//! Extraction of boundary voxels, for visualisation or surface generation.
//!
//! Both functions never mark voxels on the outermost layer of the volume: what a
//! boundary means at the edge of the field of view is undefined, so the outer
//! shell is left out entirely.

use ndarray as nd;
use rayon::prelude::*;

use crate::{
  error::to_shape,
  label::{is_region, Label},
  walker::{on_outer_shell, Connectivity, Walker3D},
};

/// Marks the interior voxels of the level set `phi <= thresh` that have at
/// least one neighbour (under `conn`) with `phi > thresh`.
pub fn morph_boundary_detection<T>(
  phi: nd::ArrayView3<T>,
  thresh: T,
  conn: Connectivity,
) -> nd::Array3<bool>
where
  T: PartialOrd + Copy + Send + Sync,
{
  let shape = to_shape(phi.shape());
  let mut border = nd::Array3::from_elem(phi.raw_dim(), false);
  nd::Zip::indexed(&mut border).into_par_iter().for_each_init(
    || Walker3D::new(shape, conn),
    |walker, ((i, j, k), px)| {
      let p = [i, j, k];
      if on_outer_shell(p, shape) || phi[p] > thresh {
        return;
      }
      walker.set_location(p);
      *px = walker.by_ref().any(|q| phi[q] > thresh);
    },
  );
  border
}

/// Marks the interior voxels carrying a region label that have at least one
/// neighbour (under `conn`) carrying a different region label. Unknown and
/// boundary-labelled neighbours are ignored.
pub fn label_boundaries<L: Label>(
  label: nd::ArrayView3<L>,
  conn: Connectivity,
) -> nd::Array3<bool> {
  let shape = to_shape(label.shape());
  let mut border = nd::Array3::from_elem(label.raw_dim(), false);
  nd::Zip::indexed(&mut border).into_par_iter().for_each_init(
    || Walker3D::new(shape, conn),
    |walker, ((i, j, k), px)| {
      let p = [i, j, k];
      let own = label[p];
      if on_outer_shell(p, shape) || !is_region(own) {
        return;
      }
      walker.set_location(p);
      *px = walker.by_ref().any(|q| is_region(label[q]) && label[q] != own);
    },
  );
  border
}
