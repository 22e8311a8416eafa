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

//! Rendering of slices through height and label volumes to png files.
//!
//! A slice is picked by an axis and an index along that axis; the two remaining
//! axes become the x and y axes of the image, one pixel per voxel.

use ndarray as nd;
use num_traits::{AsPrimitive, ToPrimitive};
use plotters::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{error::Error, path::Path};

use crate::label::{boundary_label, Label};

//Colour for NaN voxels and for unknown labels
const NAN_COL: RGBColor = BLACK;
//Colour for watershed boundary voxels
const BOUNDARY_COL: RGBColor = WHITE;

/// Signature of the colour maps accepted by [`plot_height_slice`]
pub type ColourMap<T> = fn(value: T, min: T, max: T) -> Result<RGBColor, Box<dyn Error>>;

fn take_slice<'a, T>(
  volume: nd::ArrayView3<'a, T>,
  axis: usize,
  index: usize,
) -> Result<nd::ArrayView2<'a, T>, Box<dyn Error>> {
  if axis >= 3 || index >= volume.shape()[axis] {
    return Err(format!("slice {index} along axis {axis} is outside {:?}", volume.shape()).into());
  }
  let slice = volume.index_axis_move(nd::Axis(axis), index);
  if slice.is_empty() {
    return Err("cannot plot an empty slice".into());
  }
  Ok(slice)
}

fn render_slice<T, C>(
  slice: nd::ArrayView2<T>,
  file_name: &Path,
  colour: C,
) -> Result<(), Box<dyn Error>>
where
  C: Fn(&T) -> Result<RGBColor, Box<dyn Error>>,
{
  let (x_size, y_size) = (slice.shape()[0] as u32, slice.shape()[1] as u32);
  let root = BitMapBackend::new(file_name, (x_size, y_size)).into_drawing_area();
  root.fill(&NAN_COL)?;
  for ((x, y), px) in slice.indexed_iter() {
    root.draw_pixel((x as i32, y as i32), &colour(px)?)?;
  }
  root.present()?;

  #[cfg(feature = "debug")]
  println!("slice saved as png: {file_name:?} ({x_size}x{y_size})");
  Ok(())
}

/// Plots slice `index` along `axis` of a height (or intensity) volume. Values
/// are scaled by `color_map` between the smallest and largest comparable value
/// of the slice; NaN voxels are left for the colour map to handle.
pub fn plot_height_slice<T>(
  data: nd::ArrayView3<T>,
  axis: usize,
  index: usize,
  file_name: &Path,
  color_map: ColourMap<T>,
) -> Result<(), Box<dyn Error>>
where
  T: PartialOrd + Copy,
{
  let slice = take_slice(data, axis, index)?;
  let mut values = slice.iter().copied().filter(|x| x.partial_cmp(x).is_some());
  let first = values.next().ok_or("cannot plot a slice without comparable values")?;
  let (min, max) = values.fold((first, first), |(lo, hi), x| {
    (if x < lo { x } else { lo }, if x > hi { x } else { hi })
  });
  render_slice(slice, file_name, |&v| color_map(v, min, max))
}

/// Linear grey scale between `min` (black) and `max` (white); NaN is black
pub fn grey_scale<T>(value: T, min: T, max: T) -> Result<RGBColor, Box<dyn Error>>
where
  T: std::fmt::Display + ToPrimitive,
{
  let (v, lo, hi) = match (value.to_f64(), min.to_f64(), max.to_f64()) {
    (Some(v), Some(lo), Some(hi)) => (v, lo, hi),
    _ => return Err(format!("value {value} cannot be represented as f64").into()),
  };
  if v.is_nan() {
    return Ok(NAN_COL);
  }
  let range = if hi > lo { hi - lo } else { 1.0 };
  let grey = (255.0 * (v - lo) / range).clamp(0.0, 255.0) as u8;
  Ok(RGBColor(grey, grey, grey))
}

/// Colour of a region label. Colours are random, but the same label always
/// gets the same colour.
pub fn label_colour<L: Label>(label: L) -> RGBColor {
  if label == L::zero() {
    return NAN_COL;
  }
  if label == boundary_label::<L>() {
    return BOUNDARY_COL;
  }
  let seed: usize = label.as_();
  let mut rng = StdRng::seed_from_u64(seed as u64);
  //Stay away from black and white, which are reserved
  RGBColor(rng.gen_range(32..224), rng.gen_range(32..224), rng.gen_range(32..224))
}

/// Plots slice `index` along `axis` of a label volume with one colour per
/// region, see [`label_colour`].
pub fn plot_label_slice<L: Label>(
  labels: nd::ArrayView3<L>,
  axis: usize,
  index: usize,
  file_name: &Path,
) -> Result<(), Box<dyn Error>> {
  let slice = take_slice(labels, axis, index)?;
  render_slice(slice, file_name, |&l| Ok(label_colour(l)))
}
