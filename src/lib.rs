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

//! irocs-morph is a pure-rust implementation of the 3D morphology, labelling
//! and watershed algorithms needed to segment cell nuclei and cells in confocal
//! microscopy volumes of plant root tips.
//!
//! # Features
//! The crate is organised bottom-up, leaves first:
//! 1. [`walker`]: neighbourhood walkers with 6, 18 or 26-connectivity that never
//! leave the volume.
//! 2. [`disjoint_set`]: a union-find forest for merging provisional labels.
//! 3. [`morphology`]: dilation, erosion, closing and opening with cubic or
//! spherical structuring elements, used to clean up marker masks.
//! 4. [`labelling`]: single-pass connected-component labelling.
//! 5. [`watershed`]: the marker-driven (and marker-free) watershed transform on a
//! priority queue with deterministic first-in, first-out tie breaking.
//! 6. [`boundary`]: extraction of boundary voxels between regions.
//!
//! [`statistics`] computes voxel counts, physical volumes and centres of mass of
//! the resulting regions, using the element size stored in a [`Volume`].
//!
//! All volumes are `ndarray` arrays of dimension three, indexed in logical
//! row-major order. Label fields can use any unsigned integer type: 0 means
//! unknown, the maximum value of the type marks watershed boundaries.
//!
//! ## Short example: segmenting nuclei from a mask
//! ```rust
//! use irocs_morph::prelude::*;
//! use ndarray as nd;
//!
//! //Two blobs in a 16^3 volume
//! let mut mask = nd::Array3::from_elem((16, 16, 16), false);
//! mask.slice_mut(nd::s![2..6, 2..6, 2..6]).fill(true);
//! mask.slice_mut(nd::s![9..14, 9..14, 9..14]).fill(true);
//!
//! //Close small gaps and label the markers
//! let mask = morph_close(mask.view(), StructuringElement::Sphere(1));
//! let markers: nd::Array3<u32> =
//!   morph_connected_component_labelling(mask.view(), Connectivity::TwentySix).unwrap();
//!
//! //Flood a flat height field from the markers
//! let height = nd::Array3::<f32>::zeros((16, 16, 16));
//! let watershed = WatershedBuilder::new().set_connectivity(Connectivity::Six).build().unwrap();
//! let flooded = watershed.transform(height.view(), markers.view()).unwrap();
//! assert!(flooded.is_complete());
//! ```
//!
//! # Cargo feature gates
//! *By default, all features behind cargo feature gates are **disabled***
//! - `jemalloc`: this feature enables the [jemalloc allocator](https://jemalloc.net).
//! Large floods allocate and free a lot of queue memory, which jemalloc handles
//! well. To compile `irocs-morph` with the `jemalloc` feature, jemalloc must be
//! installed on the host system.
//! - `plots`: adds the [`plotting`] module, which renders slices of height and
//! label volumes to png files with the `plotters` crate.
//! - `progress`: implements [`ProgressReporter`](progress::ProgressReporter) for
//! `indicatif` progress bars. Enabling this feature adds the `indicatif` crate
//! as a dependency.
//! - `debug`: this feature enables debug and performance monitoring output for
//! every flood. This can negatively impact performance. Enabling this feature
//! does not add additional dependencies.

//Set Jemalloc as the global allocator for this crate
#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

pub mod boundary;
pub mod disjoint_set;
pub mod error;
pub mod label;
pub mod labelling;
pub mod morphology;
pub mod progress;
pub mod statistics;
pub mod volume;
pub mod walker;
pub mod watershed;

#[cfg(feature = "plots")]
pub mod plotting;

pub use error::{MorphError, MorphResult};
pub use volume::Volume;

//Utility prelude for batch import
pub mod prelude {
  pub use crate::{
    boundary::{label_boundaries, morph_boundary_detection},
    disjoint_set::DisjointSetForest,
    error::{MorphError, MorphResult},
    label::{boundary_label, is_region, Label},
    labelling::{
      morph_connected_component_labelling, morph_connected_component_labelling_into,
      relabel_sequential,
    },
    morphology::{
      count_foreground, morph_close, morph_dilate, morph_erode, morph_open, threshold,
      StructuringElement,
    },
    progress::{FnProgress, NoProgress, ProgressReporter},
    statistics::{invalidate_border_regions, region_statistics, RegionStats},
    volume::Volume,
    walker::{Connectivity, Coord, Scanner3D, Walker3D},
    watershed::{
      find_local_minima, morph_watershed, morph_watershed_minima, FloodStats, FloodStatus,
      Flooded, Watershed, WatershedBuilder,
    },
  };
}

////////////////////////////////////////////////////////////////////////////////
//                             OPTIONAL MODULES                               //
////////////////////////////////////////////////////////////////////////////////
#[cfg(feature = "debug")]
mod performance_monitoring {

  #[derive(Clone, Debug, Default)]
  pub struct PerfReport {
    pub seeds: usize,
    pub popped: usize,
    pub skipped: usize,
    pub boundary: usize,
    pub seeding_ms: usize,
    pub flood_ms: usize,
  }

  impl PerfReport {
    pub fn pops_per_ms(&self) -> f64 {
      self.popped as f64 / (self.flood_ms.max(1) as f64)
    }
    pub fn skip_ratio(&self) -> f64 {
      self.skipped as f64 / (self.popped.max(1) as f64)
    }
  }

  impl std::fmt::Display for PerfReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      writeln!(f, ">---------[Performance Summary]---------")?;
      writeln!(f, ">  Seeded from {} voxels in {}ms", self.seeds, self.seeding_ms)?;
      writeln!(
        f,
        ">  Popped {}x ({:.1}/ms); {:.1}% already labelled",
        self.popped,
        self.pops_per_ms(),
        100.0 * self.skip_ratio()
      )?;
      writeln!(f, ">  Boundary voxels: {}", self.boundary)?;
      writeln!(f, ">--------------------------------+ total")?;
      writeln!(f, ">  {}ms", self.seeding_ms + self.flood_ms)
    }
  }
}
