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

use std::collections::HashSet;

use irocs_morph::prelude::*;
use irocs_morph::walker::raster;
use ndarray as nd;
use ndarray_rand::{rand::rngs::StdRng, rand::SeedableRng, rand_distr::Uniform, RandomExt};

//This constant determines the randomly generated volumes' sizes
const RF_SIZE: (usize, usize, usize) = (18, 16, 14);
const WALL: u32 = u32::MAX;

fn random_field(seed: u64) -> nd::Array3<u8> {
  let mut rng = StdRng::seed_from_u64(seed);
  nd::Array3::<u8>::random_using(RF_SIZE, Uniform::new(0, 255), &mut rng)
}

fn random_markers(seed: u64) -> nd::Array3<u32> {
  let mut rng = StdRng::seed_from_u64(seed);
  nd::Array3::<u32>::random_using(RF_SIZE, Uniform::new(0, 200), &mut rng)
    .mapv(|v| if v < 6 { v + 1 } else { 0 })
}

fn line(heights: &[f64]) -> nd::Array3<f64> {
  nd::Array3::from_shape_vec((1, 1, heights.len()), heights.to_vec()).unwrap()
}

#[test]
fn test_two_seeds_meet_at_midpoint() {
  let data = nd::Array3::<f32>::zeros((5, 5, 5));
  let mut marker = nd::Array3::<u32>::zeros((5, 5, 5));
  marker[[1, 1, 1]] = 1;
  marker[[3, 3, 3]] = 2;

  let labels = morph_watershed(data.view(), marker.view(), Connectivity::Six).unwrap();
  assert_eq!(labels[[2, 2, 2]], WALL);
  assert_eq!(labels[[1, 1, 1]], 1);
  assert_eq!(labels[[3, 3, 3]], 2);
  assert!(labels.iter().all(|&l| l != 0));

  //Voxels closer to one seed belong to that seed
  assert_eq!(labels[[0, 0, 0]], 1);
  assert_eq!(labels[[4, 4, 4]], 2);
  assert_eq!(labels[[1, 1, 2]], 1);

  //With 26-connectivity both seeds touch the centre directly
  let labels = morph_watershed(data.view(), marker.view(), Connectivity::TwentySix).unwrap();
  assert_eq!(labels[[2, 2, 2]], WALL);
  assert!(labels.iter().all(|&l| l != 0));
}

#[test]
fn test_height_order_and_fifo_ties() {
  /*
    The right basin is low and fills first up to index 5. The height 5 ridge
    is then popped in insertion order: index 1, index 4, index 2 and finally
    index 3, which sees both regions.
  */
  let data = line(&[0.0, 5.0, 5.0, 5.0, 5.0, 1.0, 1.0, 1.0, 0.0]);
  let mut marker = nd::Array3::<u8>::zeros(data.raw_dim());
  marker[[0, 0, 0]] = 1;
  marker[[0, 0, 8]] = 2;
  let labels = morph_watershed(data.view(), marker.view(), Connectivity::Six).unwrap();
  assert_eq!(labels.into_raw_vec(), vec![1, 1, 1, u8::MAX, 2, 2, 2, 2, 2]);
}

#[test]
fn test_symmetric_valley() {
  let data = line(&[0.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0, 1.0, 0.0]);
  let mut marker = nd::Array3::<u16>::zeros(data.raw_dim());
  marker[[0, 0, 0]] = 1;
  marker[[0, 0, 8]] = 2;
  let labels = morph_watershed(data.view(), marker.view(), Connectivity::Six).unwrap();
  assert_eq!(labels.into_raw_vec(), vec![1, 1, 1, 1, u16::MAX, 2, 2, 2, 2]);
}

#[test]
fn test_determinism() {
  let data = random_field(1);
  let marker = random_markers(2);
  for conn in [Connectivity::Six, Connectivity::Eighteen, Connectivity::TwentySix] {
    let first = morph_watershed(data.view(), marker.view(), conn).unwrap();
    let second = morph_watershed(data.view(), marker.view(), conn).unwrap();
    assert_eq!(first, second);
  }

  //Thread count does not matter for the marker-free transform either
  let run = |threads: usize| -> nd::Array3<u32> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
    pool.install(|| morph_watershed_minima(data.view(), Connectivity::Six).unwrap())
  };
  assert_eq!(run(1), run(4));
}

#[test]
fn test_seeds_are_conserved() {
  let data = random_field(3);
  let marker = random_markers(4);
  let labels = morph_watershed(data.view(), marker.view(), Connectivity::Eighteen).unwrap();
  assert!(marker.iter().zip(labels.iter()).all(|(&m, &l)| m == 0 || m == l));
}

#[test]
fn test_boundary_and_region_invariants() {
  let data = random_field(5);
  let marker = random_markers(6);
  for conn in [Connectivity::Six, Connectivity::Eighteen, Connectivity::TwentySix] {
    let watershed = WatershedBuilder::new().set_connectivity(conn).build().unwrap();
    let flooded = watershed.transform(data.view(), marker.view()).unwrap();
    assert!(flooded.is_complete());
    let labels = &flooded.labels;
    let shape = [RF_SIZE.0, RF_SIZE.1, RF_SIZE.2];
    let mut walker = Walker3D::new(shape, conn);

    for p in raster(shape) {
      walker.set_location(p);
      let around: HashSet<u32> =
        walker.by_ref().map(|q| labels[q]).filter(|&l| is_region(l)).collect();
      let own = labels[p];
      if own == WALL {
        //Boundary voxels separate at least two regions
        assert!(around.len() >= 2, "{p:?} is a wall next to {around:?}");
      } else if own == 0 {
        //Unreached voxels have no labelled neighbour
        assert!(around.is_empty(), "{p:?} was not reached but touches {around:?}");
      } else if marker[p] == 0 {
        //Grown voxels only touch their own region
        assert!(around.iter().all(|&l| l == own), "{p:?} ({own}) touches {around:?}");
      }
    }

    let stats = flooded.stats;
    let seeds = marker.iter().filter(|&&m| m != 0).count();
    assert_eq!(stats.seeds, seeds);
    assert_eq!(stats.boundary, labels.iter().filter(|&&l| l == WALL).count());
    assert_eq!(stats.popped, stats.flooded + stats.boundary + stats.skipped);
  }
}

#[test]
fn test_single_seed_covers_everything() {
  let data = random_field(7);
  let mut marker = nd::Array3::<u32>::zeros(RF_SIZE);
  marker[[4, 4, 4]] = 42;
  let labels = morph_watershed(data.view(), marker.view(), Connectivity::Six).unwrap();
  assert!(labels.iter().all(|&l| l == 42));
}

#[test]
fn test_markers_with_shared_label_merge() {
  let data = nd::Array3::<f32>::zeros((6, 6, 6));
  let mut marker = nd::Array3::<u32>::zeros((6, 6, 6));
  marker[[0, 0, 0]] = 7;
  marker[[5, 5, 5]] = 7;
  let labels = morph_watershed(data.view(), marker.view(), Connectivity::Six).unwrap();
  assert!(labels.iter().all(|&l| l == 7));
}

#[test]
fn test_no_markers() {
  let data = random_field(8);
  let marker = nd::Array3::<u32>::zeros(RF_SIZE);
  let watershed = WatershedBuilder::new().build().unwrap();
  let flooded = watershed.transform(data.view(), marker.view()).unwrap();
  assert_eq!(flooded.status, FloodStatus::Completed);
  assert!(flooded.labels.iter().all(|&l| l == 0));
  assert_eq!(flooded.stats.popped, 0);
}

#[test]
fn test_preconditions() {
  let mut data = nd::Array3::<f64>::zeros((4, 4, 4));
  let mut marker = nd::Array3::<u32>::zeros((4, 4, 4));
  marker[[0, 0, 0]] = 1;

  //Shapes have to match
  let small = nd::Array3::<u32>::zeros((4, 4, 3));
  let res = morph_watershed(data.view(), small.view(), Connectivity::Six);
  assert!(matches!(res, Err(MorphError::ShapeMismatch { .. })));

  //The boundary label cannot be a seed
  marker[[1, 2, 3]] = WALL;
  let res = morph_watershed(data.view(), marker.view(), Connectivity::Six);
  assert_eq!(res, Err(MorphError::SentinelInMarker([1, 2, 3])));
  marker[[1, 2, 3]] = 0;

  //NaN heights cannot be ordered
  data[[2, 0, 1]] = f64::NAN;
  let res = morph_watershed(data.view(), marker.view(), Connectivity::Six);
  assert_eq!(res, Err(MorphError::InvalidHeight([2, 0, 1])));
  let res = morph_watershed_minima::<f64, u32>(data.view(), Connectivity::Six);
  assert_eq!(res, Err(MorphError::InvalidHeight([2, 0, 1])));

  //Poll interval of zero
  assert!(matches!(
    WatershedBuilder::new().set_poll_interval(0).build(),
    Err(MorphError::InvalidParameter(_))
  ));
}

#[test]
fn test_cancellation_leaves_valid_partial_labelling() {
  let data = nd::Array3::<f32>::zeros((10, 10, 10));
  let mut marker = nd::Array3::<u32>::zeros((10, 10, 10));
  marker[[0, 0, 0]] = 3;

  let watershed = WatershedBuilder::new().set_poll_interval(10).build().unwrap();
  let mut polls = 0;
  let mut reporter = FnProgress(|fraction: f64| {
    assert!((0.0..=1.0).contains(&fraction));
    polls += 1;
    polls < 5
  });
  let flooded =
    watershed.transform_with_progress(data.view(), marker.view(), &mut reporter).unwrap();

  assert_eq!(flooded.status, FloodStatus::Cancelled);
  assert!(!flooded.is_complete());
  assert_eq!(flooded.stats.popped, 50);
  assert_eq!(flooded.labels[[0, 0, 0]], 3);
  let labelled = flooded.labels.iter().filter(|&&l| l == 3).count();
  assert_eq!(labelled, 1 + flooded.stats.flooded);
  assert!(labelled > 1 && labelled < 1000);
  assert!(flooded.labels.iter().all(|&l| l == 0 || l == 3));
}

#[test]
fn test_progress_reaches_one() {
  let data = random_field(9);
  let marker = random_markers(10);
  let watershed = WatershedBuilder::new().set_poll_interval(1).build().unwrap();
  let mut last = 0.0;
  let mut reporter = FnProgress(|fraction: f64| {
    assert!(fraction >= last);
    last = fraction;
    true
  });
  let flooded =
    watershed.transform_with_progress(data.view(), marker.view(), &mut reporter).unwrap();
  assert!(flooded.is_complete());
  assert_eq!(last, 1.0);
}

#[test]
fn test_transform_inplace() {
  let data = line(&[0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0]);
  let mut labels = nd::Array3::<u32>::zeros(data.raw_dim());
  labels[[0, 0, 0]] = 4;
  labels[[0, 0, 6]] = 9;
  let watershed = WatershedBuilder::new().build().unwrap();
  let (status, stats) =
    watershed.transform_inplace(data.view(), labels.view_mut(), &mut NoProgress).unwrap();
  assert_eq!(status, FloodStatus::Completed);
  assert_eq!(stats.seeds, 2);
  assert_eq!(labels.into_raw_vec(), vec![4, 4, 4, WALL, 9, 9, 9]);
}

#[test]
fn test_local_minima() {
  let data = line(&[0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0]);
  assert_eq!(find_local_minima(data.view(), Connectivity::Six), vec![[0, 0, 0], [0, 0, 6]]);

  //Squared distance to the centre, plus a second pit in a corner
  let mut bowl = nd::Array3::from_shape_fn((5, 5, 5), |(i, j, k)| {
    let d = |x: usize| (x as i32 - 2).pow(2);
    d(i) + d(j) + d(k)
  });
  bowl[[0, 4, 0]] = 0;
  let minima = find_local_minima(bowl.view(), Connectivity::TwentySix);
  assert_eq!(minima, vec![[0, 4, 0], [2, 2, 2]]);
}

#[test]
fn test_marker_free_watershed() {
  let data = line(&[0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0]);
  let labels: nd::Array3<u32> = morph_watershed_minima(data.view(), Connectivity::Six).unwrap();
  assert_eq!(labels.into_raw_vec(), vec![1, 1, 1, WALL, 2, 2, 2]);

  //Every voxel of a flat field is a minimum and seeds its own region
  let flat = nd::Array3::<u8>::zeros((2, 2, 2));
  let labels: nd::Array3<u8> = morph_watershed_minima(flat.view(), Connectivity::Six).unwrap();
  assert_eq!(labels.into_raw_vec(), (1..=8).collect::<Vec<u8>>());

  let flat = nd::Array3::<u8>::zeros((4, 5, 6));
  let labels: nd::Array3<u16> =
    morph_watershed_minima(flat.view(), Connectivity::Eighteen).unwrap();
  assert_eq!(labels.into_raw_vec(), (1..=120).collect::<Vec<u16>>());

  //...unless plateaus are merged
  let watershed = WatershedBuilder::new()
    .set_connectivity(Connectivity::Eighteen)
    .set_merge_plateaus(true)
    .build()
    .unwrap();
  assert!(watershed.merge_plateaus());
  let flooded = watershed.transform_minima::<u8, u16>(flat.view()).unwrap();
  assert!(flooded.labels.iter().all(|&l| l == 1));

  //Plateau merging only joins minima of equal height
  let steps = line(&[0.0, 0.0, 1.0, 2.0, 5.0, 3.0, 3.0]);
  let flooded = watershed.transform_minima::<f64, u32>(steps.view()).unwrap();
  assert_eq!(flooded.labels.into_raw_vec(), vec![1, 1, 1, 1, WALL, 2, 2]);

  //Random fields end up completely labelled or walled off
  let data = random_field(11);
  let flooded = WatershedBuilder::new()
    .set_connectivity(Connectivity::TwentySix)
    .build()
    .unwrap()
    .transform_minima::<u8, u32>(data.view())
    .unwrap();
  assert!(flooded.is_complete());
  let minima = find_local_minima(data.view(), Connectivity::TwentySix);
  for (rank, &p) in minima.iter().enumerate() {
    assert_eq!(flooded.labels[p], rank as u32 + 1);
  }
}

#[test]
fn test_marker_free_many_minima_in_narrow_labels() {
  //A checkerboard has one minimum per low voxel, 256 of them in an 8^3 volume
  let data = nd::Array3::from_shape_fn((8, 8, 8), |(i, j, k)| ((i + j + k) % 2) as u8);
  let res = morph_watershed_minima::<u8, u8>(data.view(), Connectivity::Six);
  assert_eq!(res, Err(MorphError::LabelOverflow(255)));
  let labels = morph_watershed_minima::<u8, u16>(data.view(), Connectivity::Six).unwrap();
  assert_eq!(labels.iter().filter(|&&l| is_region(l) && l <= 256).count(), 256);
}

struct StopOnMessage(&'static str);

impl ProgressReporter for StopOnMessage {
  fn update_progress(&mut self, _fraction: f64) -> bool {
    true
  }

  fn update_progress_message(&mut self, msg: &str) -> bool {
    msg != self.0
  }
}

#[test]
fn test_marker_free_cancellation() {
  let data = line(&[0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0]);
  let watershed = WatershedBuilder::new().set_poll_interval(1).build().unwrap();

  //Cancelled before the seeds are placed
  let mut reporter = StopOnMessage("detecting local minima");
  let flooded =
    watershed.transform_minima_with_progress::<f64, u32>(data.view(), &mut reporter).unwrap();
  assert_eq!(flooded.status, FloodStatus::Cancelled);
  assert!(flooded.labels.iter().all(|&l| l == 0));
  assert_eq!(flooded.stats, FloodStats::default());

  //Cancelled when the flood is about to start
  let mut reporter = StopOnMessage("flooding");
  let flooded =
    watershed.transform_minima_with_progress::<f64, u32>(data.view(), &mut reporter).unwrap();
  assert_eq!(flooded.status, FloodStatus::Cancelled);
  assert_eq!(flooded.labels.into_raw_vec(), vec![1, 0, 0, 0, 0, 0, 2]);

  //Cancelled at the first pop: only the seeds are labelled
  let mut reporter = FnProgress(|_: f64| false);
  let flooded =
    watershed.transform_minima_with_progress::<f64, u32>(data.view(), &mut reporter).unwrap();
  assert_eq!(flooded.status, FloodStatus::Cancelled);
  assert_eq!(flooded.stats.seeds, 2);
  assert_eq!(flooded.stats.popped, 1);
  assert_eq!(flooded.stats.flooded, 0);
  assert_eq!(flooded.labels.into_raw_vec(), vec![1, 0, 0, 0, 0, 0, 2]);

  //Letting it run gives the full result
  let mut reporter = StopOnMessage("never sent");
  let flooded =
    watershed.transform_minima_with_progress::<f64, u32>(data.view(), &mut reporter).unwrap();
  assert!(flooded.is_complete());
  assert_eq!(flooded.labels.into_raw_vec(), vec![1, 1, 1, WALL, 2, 2, 2]);
}

#[cfg(feature = "progress")]
#[test]
fn test_progress_bar_reporter() {
  use irocs_morph::progress::progress_bar;

  let mut bar = progress_bar("seeding");
  assert!(bar.update_progress(0.5));
  assert_eq!(bar.position(), 500);
  assert!(bar.update_progress_message("flooding"));
  assert_eq!(bar.message(), "flooding");

  //Fractions outside [0, 1] are clamped
  bar.update_progress(2.0);
  assert_eq!(bar.position(), 1000);

  //A bar drives a full flood
  let data = random_field(13);
  let marker = random_markers(14);
  let watershed = WatershedBuilder::new().set_poll_interval(64).build().unwrap();
  let mut bar = progress_bar("watershed");
  let flooded = watershed.transform_with_progress(data.view(), marker.view(), &mut bar).unwrap();
  assert!(flooded.is_complete());
  assert_eq!(bar.position(), 1000);
  bar.finish();
}
