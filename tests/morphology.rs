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

use irocs_morph::prelude::*;
use ndarray as nd;
use ndarray_rand::{rand::rngs::StdRng, rand::SeedableRng, rand_distr::Uniform, RandomExt};

fn random_mask(shape: (usize, usize, usize), seed: u64) -> nd::Array3<bool> {
  let mut rng = StdRng::seed_from_u64(seed);
  nd::Array3::<u8>::random_using(shape, Uniform::new(0, 10), &mut rng).mapv(|v| v < 3)
}

#[test]
fn test_dilate_single_voxel() {
  let mut mask = nd::Array3::from_elem((5, 5, 5), false);
  mask[[2, 2, 2]] = true;

  let cube = morph_dilate(mask.view(), StructuringElement::Cube(1));
  assert_eq!(count_foreground(cube.view()), 27);
  assert!(cube.slice(nd::s![1..4, 1..4, 1..4]).iter().all(|&m| m));

  let sphere = morph_dilate(mask.view(), StructuringElement::Sphere(1));
  assert_eq!(count_foreground(sphere.view()), 7);
  assert!(!sphere[[1, 1, 2]]);
}

#[test]
fn test_dilate_at_border() {
  //Windows hanging over the edge of the volume are clipped
  let mut mask = nd::Array3::from_elem((4, 4, 4), false);
  mask[[0, 0, 0]] = true;
  let dilated = morph_dilate(mask.view(), StructuringElement::Cube(1));
  assert_eq!(count_foreground(dilated.view()), 8);

  //Out-of-bounds neighbours do not erode the border
  let full = nd::Array3::from_elem((4, 4, 4), true);
  let eroded = morph_erode(full.view(), StructuringElement::Cube(2));
  assert_eq!(eroded, full);
}

#[test]
fn test_greyscale_dilate_erode() {
  let mut data = nd::Array3::<u16>::zeros((5, 5, 5));
  data[[2, 2, 2]] = 5;
  data[[0, 0, 0]] = 3;

  let dilated = morph_dilate(data.view(), StructuringElement::Sphere(1));
  assert_eq!(dilated[[2, 2, 3]], 5);
  assert_eq!(dilated[[1, 0, 0]], 3);
  assert_eq!(dilated[[2, 3, 3]], 0);

  let eroded = morph_erode(dilated.view(), StructuringElement::Sphere(1));
  assert_eq!(eroded[[2, 2, 2]], 5);
  assert_eq!(eroded[[2, 2, 3]], 0);
}

#[test]
fn test_zero_radius_is_identity() {
  let mask = random_mask((6, 7, 8), 3);
  assert_eq!(morph_dilate(mask.view(), StructuringElement::Cube(0)), mask);
  assert_eq!(morph_erode(mask.view(), StructuringElement::Sphere(0)), mask);
}

#[test]
fn test_close_fills_gap() {
  let mut mask = nd::Array3::from_elem((5, 5, 5), false);
  mask[[2, 2, 1]] = true;
  mask[[2, 2, 3]] = true;
  let closed = morph_close(mask.view(), StructuringElement::Cube(1));
  assert!(closed[[2, 2, 2]]);
  assert!(closed[[2, 2, 1]] && closed[[2, 2, 3]]);
  assert!(!closed[[0, 0, 0]]);
}

#[test]
fn test_open_removes_speck() {
  let mut mask = nd::Array3::from_elem((7, 7, 7), false);
  mask[[3, 3, 3]] = true;
  mask.slice_mut(nd::s![0..3, 0..3, 0..3]).fill(true);
  let opened = morph_open(mask.view(), StructuringElement::Cube(1));
  assert!(!opened[[3, 3, 3]]);
  assert_eq!(count_foreground(opened.view()), 27);
}

#[test]
fn test_close_is_idempotent() {
  for (seed, se) in [
    (1, StructuringElement::Cube(1)),
    (2, StructuringElement::Sphere(1)),
    (3, StructuringElement::Sphere(2)),
  ] {
    let mask = random_mask((12, 10, 9), seed);
    let once = morph_close(mask.view(), se);
    let twice = morph_close(once.view(), se);
    assert_eq!(once, twice);

    //Closing is extensive
    assert!(mask.iter().zip(once.iter()).all(|(&m, &c)| !m || c));
  }
}

#[test]
fn test_open_is_idempotent() {
  let mask = random_mask((10, 10, 10), 7);
  let once = morph_open(mask.view(), StructuringElement::Cube(1));
  let twice = morph_open(once.view(), StructuringElement::Cube(1));
  assert_eq!(once, twice);
}

#[test]
fn test_threshold() {
  let data = nd::Array3::from_shape_fn((3, 3, 3), |(i, j, k)| (i + j + k) as f32);
  let mask = threshold(data.view(), 4.0);
  assert!(mask[[2, 2, 1]]);
  assert!(!mask[[2, 1, 1]]);
  assert_eq!(count_foreground(mask.view()), 4);
}
