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

//! Disjoint-set forest (union-find) over provisional label ids.

/// Union-find structure mapping provisional label ids to canonical ones.
///
/// Ids are handed out by [`DisjointSetForest::make_set`] starting at 1; id 0 is
/// reserved for the background and is its own singleton set. `find` applies
/// full path compression and `union` merges by rank, so both run in amortised
/// near-constant time. A forest lives for a single labelling pass.
///
/// Passing an id that was never allocated is a programming error and panics.
#[derive(Debug, Clone)]
pub struct DisjointSetForest {
  parent: Vec<usize>,
  rank: Vec<u8>,
}

impl Default for DisjointSetForest {
  fn default() -> Self {
    Self::new()
  }
}

impl DisjointSetForest {
  pub fn new() -> Self {
    DisjointSetForest { parent: vec![0], rank: vec![0] }
  }

  /// Creates a forest that can hold `n` sets without reallocating
  pub fn with_capacity(n: usize) -> Self {
    let mut parent = Vec::with_capacity(n + 1);
    let mut rank = Vec::with_capacity(n + 1);
    parent.push(0);
    rank.push(0);
    DisjointSetForest { parent, rank }
  }

  /// Number of allocated ids (excluding the background id)
  pub fn len(&self) -> usize {
    self.parent.len() - 1
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Allocates a fresh singleton set and returns its id
  pub fn make_set(&mut self) -> usize {
    let id = self.parent.len();
    self.parent.push(id);
    self.rank.push(0);
    id
  }

  #[inline]
  fn check(&self, id: usize) {
    assert!(
      id < self.parent.len(),
      "label id {id} was never allocated (forest holds {})",
      self.len()
    );
  }

  /// Returns the canonical representative of `id`
  pub fn find(&mut self, id: usize) -> usize {
    self.check(id);
    let mut root = id;
    while self.parent[root] != root {
      root = self.parent[root];
    }
    //Path compression: hang everything on the way directly below the root
    let mut node = id;
    while self.parent[node] != root {
      let next = self.parent[node];
      self.parent[node] = root;
      node = next;
    }
    root
  }

  /// Merges the sets containing `a` and `b` and returns the new representative
  pub fn union(&mut self, a: usize, b: usize) -> usize {
    let (ra, rb) = (self.find(a), self.find(b));
    if ra == rb {
      return ra;
    }
    match self.rank[ra].cmp(&self.rank[rb]) {
      std::cmp::Ordering::Less => {
        self.parent[ra] = rb;
        rb
      }
      std::cmp::Ordering::Greater => {
        self.parent[rb] = ra;
        ra
      }
      std::cmp::Ordering::Equal => {
        self.parent[rb] = ra;
        self.rank[ra] += 1;
        ra
      }
    }
  }

  /// Resolves every id to its representative and renumbers the representatives
  /// densely, in order of their smallest member id.
  ///
  /// Returns the lookup table (indexed by provisional id, entry 0 maps to 0)
  /// and the number of distinct sets.
  pub fn dense_labels(&mut self) -> (Vec<usize>, usize) {
    let mut lut = vec![0usize; self.parent.len()];
    let mut count = 0;
    for id in 1..self.parent.len() {
      let root = self.find(id);
      if lut[root] == 0 {
        count += 1;
        lut[root] = count;
      }
      lut[id] = lut[root];
    }
    (lut, count)
  }
}
