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

//! Marker-driven watershed transform on a priority queue.
//!
//! The flood grows every marker into its catchment basin in order of increasing
//! height. Voxels are popped from a priority queue ordered by `(height,
//! insertion order)`; the global insertion counter makes equal-height voxels
//! come out first-in, first-out, so the result only depends on the input and
//! the connectivity. Where two different regions meet, a voxel receives the
//! boundary label (see [`crate::label::boundary_label`]) and stops growing.
//!
//! The flood is inherently sequential and runs on the calling thread. It can
//! be observed and cancelled through a [`ProgressReporter`].

use std::{cmp::Ordering, collections::BinaryHeap};

use ndarray as nd;
use rayon::prelude::*;

use crate::{
  error::{check_shape, to_shape, MorphError, MorphResult},
  label::{boundary_label, is_region, region_label, Label},
  labelling::label_components,
  progress::{NoProgress, ProgressReporter},
  walker::{raster, Connectivity, Coord, Walker3D},
};

/// Default number of queue pops between two progress polls
pub const DEFAULT_POLL_INTERVAL: usize = 1 << 16;

////////////////////////////////////////////////////////////////////////////////
//                               QUEUE ENTRIES                                //
////////////////////////////////////////////////////////////////////////////////

/// A voxel waiting to be flooded. Ordered by height first and insertion order
/// second, with the *smallest* entry comparing greatest so that `BinaryHeap`
/// pops it first.
#[derive(Debug, Clone, Copy)]
struct QueueEntry<T, L> {
  height: T,
  order: u64,
  pos: Coord,
  label: L,
}

impl<T: PartialOrd, L> Ord for QueueEntry<T, L> {
  fn cmp(&self, other: &Self) -> Ordering {
    //Heights are checked for NaN before flooding starts, so they are totally ordered
    other
      .height
      .partial_cmp(&self.height)
      .unwrap_or(Ordering::Equal)
      .then_with(|| other.order.cmp(&self.order))
  }
}

impl<T: PartialOrd, L> PartialOrd for QueueEntry<T, L> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl<T: PartialOrd, L> PartialEq for QueueEntry<T, L> {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl<T: PartialOrd, L> Eq for QueueEntry<T, L> {}

/// Priority queue with the global insertion counter
struct FloodQueue<T, L> {
  heap: BinaryHeap<QueueEntry<T, L>>,
  counter: u64,
}

impl<T: PartialOrd + Copy, L> FloodQueue<T, L> {
  fn new() -> Self {
    FloodQueue { heap: BinaryHeap::new(), counter: 0 }
  }

  #[inline]
  fn push(&mut self, height: T, pos: Coord, label: L) {
    self.heap.push(QueueEntry { height, order: self.counter, pos, label });
    self.counter += 1;
  }

  #[inline]
  fn pop(&mut self) -> Option<QueueEntry<T, L>> {
    self.heap.pop()
  }
}

////////////////////////////////////////////////////////////////////////////////
//                               FLOOD RESULTS                                //
////////////////////////////////////////////////////////////////////////////////

/// Whether a flood ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodStatus {
  /// The queue ran empty
  Completed,
  /// The progress reporter asked to stop. The label field is a valid but
  /// incomplete labelling: some reachable voxels are still 0.
  Cancelled,
}

/// Counters collected during a flood
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloodStats {
  /// Number of seed voxels the flood started from
  pub seeds: usize,
  /// Number of queue entries popped
  pub popped: usize,
  /// Popped entries whose voxel had already been labelled
  pub skipped: usize,
  /// Voxels that received a region label during the flood
  pub flooded: usize,
  /// Voxels that became boundary voxels
  pub boundary: usize,
}

/// Output of a watershed transform
#[derive(Debug, Clone)]
pub struct Flooded<L> {
  pub labels: nd::Array3<L>,
  pub status: FloodStatus,
  pub stats: FloodStats,
}

impl<L> Flooded<L> {
  pub fn is_complete(&self) -> bool {
    self.status == FloodStatus::Completed
  }
}

////////////////////////////////////////////////////////////////////////////////
//                                 THE FLOOD                                  //
////////////////////////////////////////////////////////////////////////////////

/// Floods `label` in place. Non-zero voxels are seeds, zero voxels are unknown.
/// Preconditions (shapes, no NaN, no sentinel in the seeds) are checked by the
/// callers.
fn flood<T, L>(
  data: nd::ArrayView3<T>,
  mut label: nd::ArrayViewMut3<L>,
  conn: Connectivity,
  poll_interval: usize,
  reporter: &mut dyn ProgressReporter,
) -> (FloodStatus, FloodStats)
where
  T: PartialOrd + Copy,
  L: Label,
{
  #[cfg(feature = "debug")]
  let mut perf = crate::performance_monitoring::PerfReport::default();
  #[cfg(feature = "debug")]
  let seed_start = std::time::Instant::now();

  let shape = to_shape(label.shape());
  let total = label.len().max(1) as f64;
  let mut stats = FloodStats::default();
  let mut walker = Walker3D::new(shape, conn);
  let mut queue = FloodQueue::new();

  /*(1) Enqueue the unknown neighbours of every seed
    Seeds are visited in raster order. Each neighbour is pushed with its own
    height as key and the seed's label as payload.
  */
  for p in raster(shape) {
    let seed = label[p];
    if seed == L::zero() {
      continue;
    }
    stats.seeds += 1;
    walker.set_location(p);
    for q in walker.by_ref() {
      if label[q] == L::zero() {
        queue.push(data[q], q, seed);
      }
    }
  }

  #[cfg(feature = "debug")]
  {
    perf.seeds = stats.seeds;
    perf.seeding_ms = seed_start.elapsed().as_millis() as usize;
  }
  #[cfg(feature = "debug")]
  let flood_start = std::time::Instant::now();

  if !reporter.update_progress_message("flooding") {
    return (FloodStatus::Cancelled, stats);
  }

  //(2) Pop voxels in (height, insertion order) order until the queue is empty
  let mut status = FloodStatus::Completed;
  while let Some(entry) = queue.pop() {
    stats.popped += 1;
    if stats.popped % poll_interval == 0 {
      let done = (stats.seeds + stats.flooded + stats.boundary) as f64 / total;
      if !reporter.update_progress(done) {
        status = FloodStatus::Cancelled;
        break;
      }
    }

    //(A) Enqueued more than once and already finalised: nothing to do
    if label[entry.pos] != L::zero() {
      stats.skipped += 1;
      continue;
    }

    //(B) Collect the region labels around the voxel
    walker.set_location(entry.pos);
    let mut found: Option<L> = None;
    let mut conflict = false;
    for q in walker.by_ref() {
      let l = label[q];
      if !is_region(l) {
        continue;
      }
      match found {
        None => found = Some(l),
        Some(f) if f != l => {
          conflict = true;
          break;
        }
        Some(_) => {}
      }
    }
    debug_assert!(found.is_some(), "popped {:?} without a labelled neighbour", entry.pos);

    //(C) Either a watershed line voxel, or grow the single adjacent region
    match found {
      Some(region) if !conflict => {
        debug_assert!(region == entry.label, "queue entry label is not adjacent to its voxel");
        label[entry.pos] = region;
        stats.flooded += 1;
        walker.set_location(entry.pos);
        for q in walker.by_ref() {
          if label[q] == L::zero() {
            queue.push(data[q], q, region);
          }
        }
      }
      _ => {
        label[entry.pos] = boundary_label();
        stats.boundary += 1;
      }
    }
  }

  if status == FloodStatus::Completed {
    reporter.update_progress(1.0);
  }

  #[cfg(feature = "debug")]
  {
    perf.popped = stats.popped;
    perf.skipped = stats.skipped;
    perf.boundary = stats.boundary;
    perf.flood_ms = flood_start.elapsed().as_millis() as usize;
    println!("{perf}");
  }

  (status, stats)
}

////////////////////////////////////////////////////////////////////////////////
//                              PRECONDITIONS                                 //
////////////////////////////////////////////////////////////////////////////////

/// Fails on the first height value (in raster order) that is not comparable
/// with itself, i.e. NaN
fn check_heights<T: PartialOrd>(data: &nd::ArrayView3<T>) -> MorphResult<()> {
  match data.indexed_iter().find(|(_, v)| v.partial_cmp(v).is_none()) {
    Some(((i, j, k), _)) => Err(MorphError::InvalidHeight([i, j, k])),
    None => Ok(()),
  }
}

/// Fails on the first seed that carries the boundary label
fn check_markers<L: Label>(marker: &nd::ArrayView3<L>) -> MorphResult<()> {
  match marker.indexed_iter().find(|&(_, &l)| l == boundary_label::<L>()) {
    Some(((i, j, k), _)) => Err(MorphError::SentinelInMarker([i, j, k])),
    None => Ok(()),
  }
}

////////////////////////////////////////////////////////////////////////////////
//                             LOCAL MINIMA                                   //
////////////////////////////////////////////////////////////////////////////////

/// Returns the positions of all voxels that have no strictly lower neighbour
/// under `conn`, in raster order. Computed in parallel.
///
/// Every voxel of a flat plateau that is not adjacent to a lower voxel counts
/// as a minimum. NaN heights never compare lower, so callers that care have to
/// check for them first.
pub fn find_local_minima<T>(data: nd::ArrayView3<T>, conn: Connectivity) -> Vec<Coord>
where
  T: PartialOrd + Copy + Send + Sync,
{
  let shape = to_shape(data.shape());
  let mut minima: Vec<Coord> = nd::Zip::indexed(&data)
    .into_par_iter()
    .map_init(
      || Walker3D::new(shape, conn),
      |walker, ((i, j, k), &height)| {
        walker.set_location([i, j, k]);
        if walker.by_ref().all(|q| !(data[q] < height)) {
          Some([i, j, k])
        } else {
          None
        }
      },
    )
    .flatten()
    .collect();
  minima.par_sort_unstable();
  minima
}

/// Labels the local minima of `data` as seeds and returns the seed field and
/// the number of seeds.
///
/// Every minimum voxel is a seed of its own, numbered `1..=K` in raster order.
/// With `merge_plateaus`, minimum voxels touching an equal-height minimum voxel
/// share a seed label instead.
fn minima_seeds<T, L>(
  data: nd::ArrayView3<T>,
  conn: Connectivity,
  merge_plateaus: bool,
) -> MorphResult<(nd::Array3<L>, usize)>
where
  T: PartialOrd + Copy + Send + Sync,
  L: Label,
{
  let minima = find_local_minima(data.view(), conn);
  let mut seeds = nd::Array3::<L>::zeros(data.raw_dim());
  if !merge_plateaus {
    for (rank, &p) in minima.iter().enumerate() {
      seeds[p] = region_label(rank + 1)?;
    }
    return Ok((seeds, minima.len()));
  }

  let mut is_min = nd::Array3::from_elem(data.raw_dim(), false);
  for p in minima {
    is_min[p] = true;
  }
  let count =
    label_components(seeds.view_mut(), conn, |p| is_min[p], |p, q| data[p] == data[q])?;
  Ok((seeds, count))
}

////////////////////////////////////////////////////////////////////////////////
//                           CONFIGURED TRANSFORMS                            //
////////////////////////////////////////////////////////////////////////////////

/// Builder for configuring a watershed transform.
///
/// Use `new()` to start with 6-connectivity and the default poll interval,
/// change the settings with the `set_*` methods and generate a `Watershed`
/// with `build()`. The resulting transform is `Send + Sync` and can be
/// shared between threads, although a single label field must never be
/// flooded by two transforms at once.
#[derive(Debug, Clone)]
pub struct WatershedBuilder {
  connectivity: Connectivity,
  poll_interval: usize,
  merge_plateaus: bool,
}

impl Default for WatershedBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl WatershedBuilder {
  pub fn new() -> Self {
    WatershedBuilder {
      connectivity: Connectivity::Six,
      poll_interval: DEFAULT_POLL_INTERVAL,
      merge_plateaus: false,
    }
  }

  /// Set the neighbourhood used for growing regions and detecting boundaries
  pub fn set_connectivity(mut self, conn: Connectivity) -> Self {
    self.connectivity = conn;
    self
  }

  /// Set the number of queue pops between two calls to the progress reporter.
  /// Must be at least 1.
  pub fn set_poll_interval(mut self, pops: usize) -> Self {
    self.poll_interval = pops;
    self
  }

  /// Let the marker-free transform seed every flat minimum plateau as a single
  /// region. Off by default: each minimum voxel then seeds its own region.
  pub fn set_merge_plateaus(mut self, merge: bool) -> Self {
    self.merge_plateaus = merge;
    self
  }

  /// Build a `Watershed` from the current configuration. Fails if the poll
  /// interval is zero.
  pub fn build(self) -> MorphResult<Watershed> {
    if self.poll_interval == 0 {
      return Err(MorphError::InvalidParameter("poll interval must be at least 1".to_string()));
    }
    Ok(Watershed {
      connectivity: self.connectivity,
      poll_interval: self.poll_interval,
      merge_plateaus: self.merge_plateaus,
    })
  }
}

/// A configured watershed transform. See the module documentation for the
/// algorithm.
#[derive(Debug, Clone, Copy)]
pub struct Watershed {
  connectivity: Connectivity,
  poll_interval: usize,
  merge_plateaus: bool,
}

impl Watershed {
  pub fn connectivity(&self) -> Connectivity {
    self.connectivity
  }

  pub fn poll_interval(&self) -> usize {
    self.poll_interval
  }

  pub fn merge_plateaus(&self) -> bool {
    self.merge_plateaus
  }

  /// Floods `label` in place. On entry `label` holds the markers (non-zero seed
  /// ids) and 0 everywhere else; seeds are never overwritten. Voxels that the
  /// flood cannot reach keep the value 0.
  pub fn transform_inplace<T, L>(
    &self,
    data: nd::ArrayView3<T>,
    label: nd::ArrayViewMut3<L>,
    reporter: &mut dyn ProgressReporter,
  ) -> MorphResult<(FloodStatus, FloodStats)>
  where
    T: PartialOrd + Copy,
    L: Label,
  {
    check_shape("label", data.shape(), label.shape())?;
    check_heights(&data)?;
    check_markers(&label.view())?;
    Ok(flood(data, label, self.connectivity, self.poll_interval, reporter))
  }

  /// Marker-driven watershed transform with progress reporting and
  /// cancellation. `marker` holds a non-zero region id at every seed voxel.
  pub fn transform_with_progress<T, L>(
    &self,
    data: nd::ArrayView3<T>,
    marker: nd::ArrayView3<L>,
    reporter: &mut dyn ProgressReporter,
  ) -> MorphResult<Flooded<L>>
  where
    T: PartialOrd + Copy,
    L: Label,
  {
    check_shape("marker", data.shape(), marker.shape())?;
    let mut labels = marker.to_owned();
    let (status, stats) = self.transform_inplace(data, labels.view_mut(), reporter)?;
    Ok(Flooded { labels, status, stats })
  }

  /// Marker-driven watershed transform that always runs to completion
  pub fn transform<T, L>(
    &self,
    data: nd::ArrayView3<T>,
    marker: nd::ArrayView3<L>,
  ) -> MorphResult<Flooded<L>>
  where
    T: PartialOrd + Copy,
    L: Label,
  {
    self.transform_with_progress(data, marker, &mut NoProgress)
  }

  /// Marker-free watershed transform: every local minimum of `data` becomes a
  /// seed with a fresh label before the flood starts (see
  /// [`WatershedBuilder::set_merge_plateaus`]).
  pub fn transform_minima_with_progress<T, L>(
    &self,
    data: nd::ArrayView3<T>,
    reporter: &mut dyn ProgressReporter,
  ) -> MorphResult<Flooded<L>>
  where
    T: PartialOrd + Copy + Send + Sync,
    L: Label,
  {
    check_heights(&data)?;
    if !reporter.update_progress_message("detecting local minima") {
      let labels = nd::Array3::zeros(data.raw_dim());
      return Ok(Flooded { labels, status: FloodStatus::Cancelled, stats: FloodStats::default() });
    }
    let (mut labels, _) =
      minima_seeds::<T, L>(data.view(), self.connectivity, self.merge_plateaus)?;
    let (status, stats) =
      flood(data, labels.view_mut(), self.connectivity, self.poll_interval, reporter);
    Ok(Flooded { labels, status, stats })
  }

  /// Marker-free watershed transform that always runs to completion
  pub fn transform_minima<T, L>(&self, data: nd::ArrayView3<T>) -> MorphResult<Flooded<L>>
  where
    T: PartialOrd + Copy + Send + Sync,
    L: Label,
  {
    self.transform_minima_with_progress(data, &mut NoProgress)
  }
}

////////////////////////////////////////////////////////////////////////////////
//                             PLAIN FUNCTIONS                                //
////////////////////////////////////////////////////////////////////////////////

/// Marker-driven watershed transform of the height field `data`.
///
/// Every non-zero voxel of `marker` is a seed and keeps its label; the seeds
/// grow in order of increasing height until they meet. Voxels touching two
/// different regions when they are reached get the boundary label. Markers
/// sharing an id grow as a single region. Without any markers the output is
/// all zero.
///
/// ```
/// use irocs_morph::prelude::*;
/// use ndarray as nd;
///
/// let data = nd::Array3::<f32>::zeros((5, 5, 5));
/// let mut marker = nd::Array3::<u16>::zeros((5, 5, 5));
/// marker[[1, 1, 1]] = 1;
/// marker[[3, 3, 3]] = 2;
/// let labels = morph_watershed(data.view(), marker.view(), Connectivity::Six).unwrap();
/// assert_eq!(labels[[2, 2, 2]], boundary_label::<u16>());
/// ```
pub fn morph_watershed<T, L>(
  data: nd::ArrayView3<T>,
  marker: nd::ArrayView3<L>,
  conn: Connectivity,
) -> MorphResult<nd::Array3<L>>
where
  T: PartialOrd + Copy,
  L: Label,
{
  let watershed = WatershedBuilder::new().set_connectivity(conn).build()?;
  Ok(watershed.transform(data, marker)?.labels)
}

/// Marker-free watershed transform: local minima of `data` are used as seeds.
pub fn morph_watershed_minima<T, L>(
  data: nd::ArrayView3<T>,
  conn: Connectivity,
) -> MorphResult<nd::Array3<L>>
where
  T: PartialOrd + Copy + Send + Sync,
  L: Label,
{
  let watershed = WatershedBuilder::new().set_connectivity(conn).build()?;
  Ok(watershed.transform_minima(data)?.labels)
}
