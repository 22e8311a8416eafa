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

//! Per-region statistics of label fields and border clean-up.
//!
//! Sums are accumulated per rayon task and merged afterwards. Coordinates are
//! summed as integers, so the results do not depend on how the work was split
//! between threads.

use std::collections::{HashMap, HashSet};

use ndarray as nd;
use rayon::prelude::*;

use crate::{
  error::to_shape,
  label::{is_region, Label},
  volume::Volume,
  walker::on_outer_shell,
};

/// Size and position of one labelled region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats<L> {
  pub label: L,
  /// Number of voxels carrying the label
  pub voxel_count: usize,
  /// Physical volume (voxel count times the volume of one voxel)
  pub volume: f64,
  /// Centre of mass in physical units, per axis
  pub center_of_mass: [f64; 3],
}

#[derive(Debug, Clone, Copy, Default)]
struct Partial {
  count: u64,
  sum: [u64; 3],
}

impl Partial {
  fn merge(mut self, other: Partial) -> Partial {
    self.count += other.count;
    (0..3).for_each(|ax| self.sum[ax] += other.sum[ax]);
    self
  }
}

/// Computes the statistics of every region of a label volume, sorted by label.
/// Unknown (0) and boundary voxels are not part of any region.
pub fn region_statistics<L: Label>(labels: &Volume<L>) -> Vec<RegionStats<L>> {
  let partials: HashMap<L, Partial> = nd::Zip::indexed(labels.view())
    .into_par_iter()
    .fold(HashMap::new, |mut acc: HashMap<L, Partial>, ((i, j, k), &l)| {
      if is_region(l) {
        let part = acc.entry(l).or_default();
        part.count += 1;
        part.sum[0] += i as u64;
        part.sum[1] += j as u64;
        part.sum[2] += k as u64;
      }
      acc
    })
    .reduce(HashMap::new, |mut a, b| {
      for (l, part) in b {
        let merged = a.get(&l).copied().unwrap_or_default().merge(part);
        a.insert(l, merged);
      }
      a
    });

  let element_size = labels.element_size();
  let voxel_volume = labels.voxel_volume();
  let mut stats: Vec<RegionStats<L>> = partials
    .into_iter()
    .map(|(label, part)| {
      let n = part.count as f64;
      let mut center_of_mass = [0.0; 3];
      for ax in 0..3 {
        center_of_mass[ax] = part.sum[ax] as f64 / n * element_size[ax];
      }
      RegionStats {
        label,
        voxel_count: part.count as usize,
        volume: n * voxel_volume,
        center_of_mass,
      }
    })
    .collect();
  stats.sort_unstable_by_key(|s| s.label);
  stats
}

/// Resets every region touching the outermost layer of the volume to 0, since
/// such regions are cut off by the field of view and their statistics are
/// meaningless. Returns the number of regions that were removed.
pub fn invalidate_border_regions<L: Label>(label: nd::ArrayViewMut3<L>) -> usize {
  let shape = to_shape(label.shape());
  let touching: HashSet<L> = nd::Zip::indexed(label.view())
    .into_par_iter()
    .filter(|&((i, j, k), &l)| is_region(l) && on_outer_shell([i, j, k], shape))
    .map(|(_, &l)| l)
    .collect();

  if !touching.is_empty() {
    label.into_par_iter().filter(|px| touching.contains(&**px)).for_each(|px| *px = L::zero());
  }
  touching.len()
}
