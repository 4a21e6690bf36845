// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use std::mem;

use crate::geometry::aabb::Aabb;

/// Bounding-box hierarchy over payloads `D`: mesh triangle handles in 3D,
/// trim polygon edges in 2D.
///
/// Removal marks leaves invalid; once fewer than half of the leaves are
/// valid the tree is rebuilt from the survivors.
#[derive(Clone, Debug)]
pub enum AabbTree<const N: usize, D> {
    Empty,
    Leaf {
        aabb: Aabb<N>,
        data: D,
        valid: bool,
    },
    Node {
        aabb: Aabb<N>,
        left: Box<AabbTree<N, D>>,
        right: Box<AabbTree<N, D>>,
        valid_count: usize,
        total_count: usize,
    },
}

impl<const N: usize, D> Default for AabbTree<N, D> {
    fn default() -> Self {
        AabbTree::Empty
    }
}

impl<const N: usize, D: Clone + PartialEq> AabbTree<N, D> {
    pub fn new() -> Self {
        AabbTree::Empty
    }

    /// Bulk build over `(aabb, data)` pairs by recursive median split.
    pub fn build(items: Vec<(Aabb<N>, D)>) -> Self {
        if items.is_empty() {
            return AabbTree::Empty;
        }
        Self::build_binary_tree(items)
    }

    fn build_binary_tree(mut items: Vec<(Aabb<N>, D)>) -> Self {
        if items.len() == 1 {
            if let Some((aabb, data)) = items.pop() {
                return AabbTree::Leaf {
                    aabb,
                    data,
                    valid: true,
                };
            }
        }

        let bounds = items
            .iter()
            .skip(1)
            .fold(items[0].0, |acc, (b, _)| acc.union(b));
        let axis = bounds.longest_axis();
        items.sort_by(|a, b| a.0.center(axis).total_cmp(&b.0.center(axis)));

        let mid = items.len() / 2;
        let right_items = items.split_off(mid); // items = left half

        let left_child = Box::new(Self::build_binary_tree(items));
        let right_child = Box::new(Self::build_binary_tree(right_items));
        let total_items = left_child.size() + right_child.size();

        AabbTree::Node {
            aabb: bounds,
            left: left_child,
            right: right_child,
            valid_count: total_items,
            total_count: total_items,
        }
    }

    /// Get AABB of this node/leaf
    pub fn aabb(&self) -> Option<&Aabb<N>> {
        match self {
            AabbTree::Empty => None,
            AabbTree::Leaf { aabb, .. } => Some(aabb),
            AabbTree::Node { aabb, .. } => Some(aabb),
        }
    }

    /// Number of valid entries.
    pub fn len(&self) -> usize {
        match self {
            AabbTree::Empty => 0,
            AabbTree::Leaf { valid, .. } => usize::from(*valid),
            AabbTree::Node { valid_count, .. } => *valid_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tree size including invalidated leaves.
    fn size(&self) -> usize {
        match self {
            AabbTree::Empty => 0,
            AabbTree::Leaf { .. } => 1,
            AabbTree::Node { total_count, .. } => *total_count,
        }
    }

    pub fn clear(&mut self) {
        *self = AabbTree::Empty;
    }

    /// Add a new entry to the existing tree.
    pub fn insert(&mut self, new_aabb: Aabb<N>, new_data: D) {
        self.insert_inner(new_aabb, new_data);
    }

    /// Returns how many leaf slots were added (0 when an invalid leaf was reused).
    fn insert_inner(&mut self, new_aabb: Aabb<N>, new_data: D) -> usize {
        match self {
            AabbTree::Empty | AabbTree::Leaf { valid: false, .. } => {
                let reused = usize::from(matches!(self, AabbTree::Leaf { .. }));
                *self = AabbTree::Leaf {
                    aabb: new_aabb,
                    data: new_data,
                    valid: true,
                };
                1 - reused
            }
            AabbTree::Leaf { .. } => {
                let old_leaf = mem::take(self);
                let combined_aabb = old_leaf
                    .aabb()
                    .map_or(new_aabb, |old| old.union(&new_aabb));
                *self = AabbTree::Node {
                    aabb: combined_aabb,
                    left: Box::new(old_leaf),
                    right: Box::new(AabbTree::Leaf {
                        aabb: new_aabb,
                        data: new_data,
                        valid: true,
                    }),
                    valid_count: 2,
                    total_count: 2,
                };
                1
            }
            AabbTree::Node {
                aabb,
                left,
                right,
                valid_count,
                total_count,
            } => {
                *aabb = aabb.union(&new_aabb);
                let added = if left.size() <= right.size() {
                    left.insert_inner(new_aabb, new_data)
                } else {
                    right.insert_inner(new_aabb, new_data)
                };
                *valid_count += 1;
                *total_count += added;
                added
            }
        }
    }

    /// Remove the entry `target` stored under a box overlapping `aabb`.
    pub fn remove(&mut self, aabb: &Aabb<N>, target: &D) -> bool {
        let removed = self.invalidate(aabb, target);
        if removed && self.needs_rebuild() {
            self.compact();
        }
        removed
    }

    fn invalidate(&mut self, query: &Aabb<N>, target: &D) -> bool {
        match self {
            AabbTree::Empty => false,
            AabbTree::Leaf { aabb, data, valid } => {
                if *valid && data == target && aabb.intersects(query) {
                    *valid = false;
                    return true;
                }
                false
            }
            AabbTree::Node {
                aabb,
                left,
                right,
                valid_count,
                ..
            } => {
                if *valid_count == 0 || !aabb.intersects(query) {
                    return false;
                }
                if left.invalidate(query, target) || right.invalidate(query, target) {
                    *valid_count -= 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Check if tree needs rebuilding (O(1))
    pub fn needs_rebuild(&self) -> bool {
        match self {
            AabbTree::Empty => false,
            AabbTree::Leaf { valid, .. } => !valid,
            AabbTree::Node {
                valid_count,
                total_count,
                ..
            } => (*valid_count as f64 / *total_count as f64) < 0.5,
        }
    }

    /// Compact tree by removing invalid entries (O(n))
    pub fn compact(&mut self) {
        let mut valid_items = Vec::with_capacity(self.len());
        self.collect_valid(&mut valid_items);
        *self = Self::build(valid_items);
    }

    /// Collect all valid (aabb, data) pairs
    pub fn collect_valid(&self, out: &mut Vec<(Aabb<N>, D)>) {
        match self {
            AabbTree::Empty => {}
            AabbTree::Leaf { aabb, data, valid } => {
                if *valid {
                    out.push((*aabb, data.clone()));
                }
            }
            AabbTree::Node { left, right, .. } => {
                left.collect_valid(out);
                right.collect_valid(out);
            }
        }
    }

    /// Collect all `&D` whose AABB intersects `query`.
    pub fn query<'a>(&'a self, query: &Aabb<N>, out: &mut Vec<&'a D>) {
        match self {
            AabbTree::Empty => {}
            AabbTree::Leaf { aabb, data, valid } => {
                if *valid && aabb.intersects(query) {
                    out.push(data);
                }
            }
            AabbTree::Node {
                aabb,
                left,
                right,
                valid_count,
                ..
            } => {
                if *valid_count > 0 && aabb.intersects(query) {
                    left.query(query, out);
                    right.query(query, out);
                }
            }
        }
    }

    /// Visit every entry overlapping `query`. The callback returns `false`
    /// to stop the search. Returns the number of entries visited.
    pub fn search<F>(&self, query: &Aabb<N>, mut callback: F) -> usize
    where
        F: FnMut(&D) -> bool,
    {
        let mut hits = 0;
        self.search_inner(query, &mut callback, &mut hits);
        hits
    }

    fn search_inner<F>(&self, query: &Aabb<N>, callback: &mut F, hits: &mut usize) -> bool
    where
        F: FnMut(&D) -> bool,
    {
        match self {
            AabbTree::Empty => true,
            AabbTree::Leaf { aabb, data, valid } => {
                if *valid && aabb.intersects(query) {
                    *hits += 1;
                    return callback(data);
                }
                true
            }
            AabbTree::Node {
                aabb,
                left,
                right,
                valid_count,
                ..
            } => {
                if *valid_count == 0 || !aabb.intersects(query) {
                    return true;
                }
                left.search_inner(query, callback, hits) && right.search_inner(query, callback, hits)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::Point;

    fn unit_box(x: f64, y: f64) -> Aabb<2> {
        Aabb::from_points(&Point::new([x, y]), &Point::new([x + 1.0, y + 1.0]))
    }

    #[test]
    fn removal_compacts_below_half() {
        let mut tree = AabbTree::build((0..8).map(|i| (unit_box(i as f64 * 2.0, 0.0), i)).collect());
        assert_eq!(tree.len(), 8);
        for i in 0..5 {
            assert!(tree.remove(&unit_box(i as f64 * 2.0, 0.0), &i));
        }
        assert_eq!(tree.len(), 3);
        assert!(!tree.needs_rebuild());
        assert!(!tree.remove(&unit_box(0.0, 0.0), &0));
    }

    #[test]
    fn insert_reuses_invalid_leaf() {
        let mut tree = AabbTree::new();
        tree.insert(unit_box(0.0, 0.0), 1usize);
        assert!(tree.remove(&unit_box(0.0, 0.0), &1));
        assert!(tree.is_empty());
        tree.insert(unit_box(5.0, 5.0), 2);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.size(), 1);
    }
}
