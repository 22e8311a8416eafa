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

//! Voxel grids that know their physical voxel spacing.

use ndarray as nd;

use crate::error::{MorphError, MorphResult};

/// A 3D voxel grid together with its element size (voxel spacing, typically in
/// micrometres per axis).
///
/// None of the flooding or labelling algorithms look at the element size. It
/// only matters to consumers that report physical quantities, like
/// [`crate::statistics::region_statistics`].
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
  data: nd::Array3<T>,
  element_size: [f64; 3],
}

impl<T> Volume<T> {
  /// Wraps `data` with unit element size
  pub fn new(data: nd::Array3<T>) -> Self {
    Volume { data, element_size: [1.0; 3] }
  }

  /// Wraps `data` with the given element size. Every component has to be
  /// finite and strictly positive.
  pub fn with_element_size(data: nd::Array3<T>, element_size: [f64; 3]) -> MorphResult<Self> {
    if element_size.iter().any(|&s| !(s.is_finite() && s > 0.0)) {
      return Err(MorphError::InvalidParameter(format!(
        "element size {element_size:?} must be finite and positive"
      )));
    }
    Ok(Volume { data, element_size })
  }

  pub fn shape(&self) -> [usize; 3] {
    crate::error::to_shape(self.data.shape())
  }

  pub fn element_size(&self) -> [f64; 3] {
    self.element_size
  }

  /// Physical volume of a single voxel
  pub fn voxel_volume(&self) -> f64 {
    self.element_size.iter().product()
  }

  pub fn get(&self, p: [usize; 3]) -> Option<&T> {
    self.data.get(p)
  }

  pub fn get_mut(&mut self, p: [usize; 3]) -> Option<&mut T> {
    self.data.get_mut(p)
  }

  pub fn view(&self) -> nd::ArrayView3<T> {
    self.data.view()
  }

  pub fn view_mut(&mut self) -> nd::ArrayViewMut3<T> {
    self.data.view_mut()
  }

  pub fn data(&self) -> &nd::Array3<T> {
    &self.data
  }

  pub fn into_inner(self) -> nd::Array3<T> {
    self.data
  }

  /// Replaces the voxel data while keeping the element size. The new data has
  /// to have the same shape as the old data.
  pub fn map_data<U, F>(&self, f: F) -> MorphResult<Volume<U>>
  where
    F: FnOnce(nd::ArrayView3<T>) -> MorphResult<nd::Array3<U>>,
  {
    let data = f(self.data.view())?;
    crate::error::check_shape("mapped volume", self.data.shape(), data.shape())?;
    Ok(Volume { data, element_size: self.element_size })
  }
}
