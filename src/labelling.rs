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

//! Connected-component labelling with a single-pass union-find scan.

use ndarray as nd;
use num_traits::NumCast;
use rayon::prelude::*;

use crate::{
  disjoint_set::DisjointSetForest,
  error::{check_shape, to_shape, MorphResult},
  label::{region_label, Label},
  walker::{raster, Connectivity, Coord, Scanner3D},
};

/// Labels the components of the set of voxels selected by `is_fg`, where two
/// neighbouring selected voxels `p` and `q` belong together if `joins(p, q)`.
///
/// This is the shared core of component labelling and of plateau detection in
/// the marker-free watershed. Unselected voxels get label 0. Returns the number
/// of components, which are numbered `1..=K`.
pub(crate) fn label_components<L, F, J>(
  mut label: nd::ArrayViewMut3<L>,
  conn: Connectivity,
  is_fg: F,
  joins: J,
) -> MorphResult<usize>
where
  L: Label,
  F: Fn(Coord) -> bool,
  J: Fn(Coord, Coord) -> bool,
{
  let shape = to_shape(label.shape());
  let mut forest = DisjointSetForest::new();
  let mut scanner = Scanner3D::new(shape, conn);
  //Provisional ids; only the dense ids of step (2) are converted to `L`
  let mut provisional = nd::Array3::<usize>::zeros(label.raw_dim());

  /*(1) Forward raster scan
    The scanner only yields neighbours that the scan has already visited, so
    their provisional ids are final for the purpose of this pass. We adopt
    the smallest provisional id among them and record all of them as
    equivalent in the forest.
  */
  for p in raster(shape) {
    if !is_fg(p) {
      continue;
    }
    scanner.set_location(p);
    let mut current: Option<usize> = None;
    for q in scanner.by_ref() {
      if !is_fg(q) || !joins(p, q) {
        continue;
      }
      let id = provisional[q];
      current = Some(match current {
        None => id,
        Some(c) => {
          forest.union(c, id);
          c.min(id)
        }
      });
    }
    provisional[p] = match current {
      Some(id) => id,
      None => forest.make_set(),
    };
  }

  //(2) Resolve provisional ids to dense canonical labels
  let (lut, count) = forest.dense_labels();
  //Fails unless all K components fit in `L`
  region_label::<L>(count)?;
  let lut: Vec<L> = lut.into_iter().map(region_label::<L>).collect::<MorphResult<_>>()?;
  nd::Zip::from(&mut label).and(&provisional).par_for_each(|px, &id| *px = lut[id]);
  Ok(count)
}

/// Labels the connected components of the foreground of `marker` into `label`.
///
/// Foreground voxels are those that differ from `T::default()` (`true` for
/// `bool` masks, non-zero for numeric masks). Two foreground voxels share a
/// label if and only if a path of foreground voxels under `conn` connects them.
/// Components are numbered `1..=K` and background voxels are set to 0. The
/// numbering of components is an implementation detail.
///
/// Returns `K`, the number of components. Fails if the shapes of `marker` and
/// `label` differ, or if the scan needs more provisional labels than `L` can
/// hold.
pub fn morph_connected_component_labelling_into<T, L>(
  marker: nd::ArrayView3<T>,
  label: nd::ArrayViewMut3<L>,
  conn: Connectivity,
) -> MorphResult<usize>
where
  T: Copy + Default + PartialEq,
  L: Label,
{
  check_shape("label", marker.shape(), label.shape())?;
  let bg = T::default();
  label_components(label, conn, |p| marker[p] != bg, |_, _| true)
}

/// Returns the connected-component labelling of the foreground of `marker`,
/// see [`morph_connected_component_labelling_into`].
///
/// ```
/// use irocs_morph::prelude::*;
/// use ndarray as nd;
///
/// let mut mask = nd::Array3::from_elem((5, 5, 5), false);
/// mask[[0, 0, 0]] = true;
/// mask[[4, 4, 4]] = true;
/// let labels: nd::Array3<u32> =
///   morph_connected_component_labelling(mask.view(), Connectivity::TwentySix).unwrap();
/// assert_ne!(labels[[0, 0, 0]], labels[[4, 4, 4]]);
/// ```
pub fn morph_connected_component_labelling<T, L>(
  marker: nd::ArrayView3<T>,
  conn: Connectivity,
) -> MorphResult<nd::Array3<L>>
where
  T: Copy + Default + PartialEq,
  L: Label,
{
  let mut label = nd::Array3::<L>::zeros(marker.raw_dim());
  morph_connected_component_labelling_into(marker, label.view_mut(), conn)?;
  Ok(label)
}

/// Renumbers the regions of a label field densely to `1..=K`, preserving their
/// relative order. Unknown (0) and boundary voxels are left alone. Returns `K`.
pub fn relabel_sequential<L: Label>(label: nd::ArrayViewMut3<L>) -> usize {
  let mut present: Vec<L> = label
    .view()
    .into_par_iter()
    .copied()
    .filter(|&l| crate::label::is_region(l))
    .collect();
  present.par_sort_unstable();
  present.dedup();

  let count = present.len();
  label.into_par_iter().filter(|px| crate::label::is_region(**px)).for_each(|px| {
    //Every region label is in `present` and `present.len() < L::max_value()`
    if let Ok(rank) = present.binary_search(&*px) {
      if let Some(new) = <L as NumCast>::from(rank + 1) {
        *px = new;
      }
    }
  });
  count
}
