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

//! Neighbourhood walkers over 3D voxel grids.
//!
//! All neighbourhood-based algorithms in this crate enumerate neighbours through
//! a [`Walker3D`] (full neighbourhood) or a [`Scanner3D`] (causal half of the
//! neighbourhood). Both skip neighbours outside of `[0, shape)`, so no algorithm
//! ever has to deal with out-of-bounds coordinates itself.

use crate::error::MorphError;

/// A voxel coordinate in logical (row-major) index order
pub type Coord = [usize; 3];

/// Face neighbours
const FACES: [[isize; 3]; 6] =
  [[-1, 0, 0], [0, -1, 0], [0, 0, -1], [0, 0, 1], [0, 1, 0], [1, 0, 0]];

/// Edge neighbours
const EDGES: [[isize; 3]; 12] = [
  [-1, -1, 0],
  [-1, 0, -1],
  [-1, 0, 1],
  [-1, 1, 0],
  [0, -1, -1],
  [0, -1, 1],
  [0, 1, -1],
  [0, 1, 1],
  [1, -1, 0],
  [1, 0, -1],
  [1, 0, 1],
  [1, 1, 0],
];

/// Corner neighbours
const CORNERS: [[isize; 3]; 8] = [
  [-1, -1, -1],
  [-1, -1, 1],
  [-1, 1, -1],
  [-1, 1, 1],
  [1, -1, -1],
  [1, -1, 1],
  [1, 1, -1],
  [1, 1, 1],
];

/// Which voxels count as adjacent to a voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Connectivity {
  /// Face neighbours only
  #[default]
  Six,
  /// Face and edge neighbours
  Eighteen,
  /// Face, edge and corner neighbours
  TwentySix,
}

impl Connectivity {
  /// Number of neighbours of an interior voxel
  pub fn count(self) -> usize {
    match self {
      Connectivity::Six => 6,
      Connectivity::Eighteen => 18,
      Connectivity::TwentySix => 26,
    }
  }

  /// Neighbour offsets for this connectivity. The order is fixed: faces, then
  /// edges, then corners.
  pub fn offsets(self) -> Vec<[isize; 3]> {
    let mut offsets = FACES.to_vec();
    if self != Connectivity::Six {
      offsets.extend_from_slice(&EDGES);
    }
    if self == Connectivity::TwentySix {
      offsets.extend_from_slice(&CORNERS);
    }
    offsets
  }

  /// Offsets that precede the centre voxel in raster order (lexicographically
  /// smaller than `[0, 0, 0]`). Exactly half of [`Connectivity::offsets`].
  pub fn causal_offsets(self) -> Vec<[isize; 3]> {
    self.offsets().into_iter().filter(|&off| off < [0, 0, 0]).collect()
  }
}

impl TryFrom<u32> for Connectivity {
  type Error = MorphError;

  fn try_from(value: u32) -> Result<Self, Self::Error> {
    match value {
      6 => Ok(Connectivity::Six),
      18 => Ok(Connectivity::Eighteen),
      26 => Ok(Connectivity::TwentySix),
      other => Err(MorphError::InvalidConnectivity(other)),
    }
  }
}

impl From<Connectivity> for u32 {
  fn from(conn: Connectivity) -> u32 {
    conn.count() as u32
  }
}

#[inline(always)]
fn shift(p: Coord, off: [isize; 3], shape: Coord) -> Option<Coord> {
  let mut q = [0usize; 3];
  for ax in 0..3 {
    let c = p[ax] as isize + off[ax];
    if c < 0 || c >= shape[ax] as isize {
      return None;
    }
    q[ax] = c as usize;
  }
  Some(q)
}

/// Returns true if `p` lies on the outermost layer of a grid along any axis
#[inline]
pub fn on_outer_shell(p: Coord, shape: Coord) -> bool {
  (0..3).any(|ax| p[ax] == 0 || p[ax] + 1 >= shape[ax])
}

/// Enumerates all in-bounds neighbours of a centre voxel.
///
/// ```
/// use irocs_morph::walker::{Connectivity, Walker3D};
///
/// let mut walker = Walker3D::new([3, 3, 3], Connectivity::Six);
/// walker.set_location([0, 0, 0]);
/// assert_eq!(walker.count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Walker3D {
  shape: Coord,
  offsets: Vec<[isize; 3]>,
  centre: Coord,
  next: usize,
}

impl Walker3D {
  pub fn new(shape: Coord, conn: Connectivity) -> Self {
    Self::with_offsets(shape, conn.offsets())
  }

  fn with_offsets(shape: Coord, offsets: Vec<[isize; 3]>) -> Self {
    //Start exhausted: nothing is yielded before `set_location` is called
    let next = offsets.len();
    Walker3D { shape, offsets, centre: [0; 3], next }
  }

  /// Resets the walker to enumerate the neighbours of `p`
  #[inline]
  pub fn set_location(&mut self, p: Coord) {
    debug_assert!((0..3).all(|ax| p[ax] < self.shape[ax]), "{p:?} outside {:?}", self.shape);
    self.centre = p;
    self.next = 0;
  }

  pub fn shape(&self) -> Coord {
    self.shape
  }

  pub fn location(&self) -> Coord {
    self.centre
  }
}

impl Iterator for Walker3D {
  type Item = Coord;

  #[inline]
  fn next(&mut self) -> Option<Coord> {
    while self.next < self.offsets.len() {
      let off = self.offsets[self.next];
      self.next += 1;
      if let Some(q) = shift(self.centre, off, self.shape) {
        return Some(q);
      }
    }
    None
  }
}

/// Half-neighbourhood walker: yields only the neighbours of the centre voxel
/// that were already visited by a forward raster scan.
///
/// A raster scan visits `[i0, i1, i2]` with `i2` varying fastest, which is the
/// logical iteration order of `ndarray`. Merging over the causal neighbours of
/// every voxel touches each undirected adjacency exactly once.
#[derive(Debug, Clone)]
pub struct Scanner3D(Walker3D);

impl Scanner3D {
  pub fn new(shape: Coord, conn: Connectivity) -> Self {
    Scanner3D(Walker3D::with_offsets(shape, conn.causal_offsets()))
  }

  #[inline]
  pub fn set_location(&mut self, p: Coord) {
    self.0.set_location(p)
  }
}

impl Iterator for Scanner3D {
  type Item = Coord;

  #[inline]
  fn next(&mut self) -> Option<Coord> {
    self.0.next()
  }
}

/// Iterates over all coordinates of a grid in raster order
pub fn raster(shape: Coord) -> impl Iterator<Item = Coord> {
  (0..shape[0])
    .flat_map(move |i| (0..shape[1]).flat_map(move |j| (0..shape[2]).map(move |k| [i, j, k])))
}
