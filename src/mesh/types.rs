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

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Directed edge; each triangle claims three of these in its vertex order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub v0: usize,
    pub v1: usize,
}

impl Edge {
    pub fn new(v0: usize, v1: usize) -> Self {
        Edge { v0, v1 }
    }

    pub fn reversed(&self) -> Self {
        Edge {
            v0: self.v1,
            v1: self.v0,
        }
    }
}

/// Undirected edge, stored as `(min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UEdge {
    pub v: [usize; 2],
}

impl UEdge {
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            UEdge { v: [a, b] }
        } else {
            UEdge { v: [b, a] }
        }
    }

    pub fn has_vertex(&self, v: usize) -> bool {
        self.v[0] == v || self.v[1] == v
    }

    /// The endpoint that is not `v`.
    pub fn other(&self, v: usize) -> Option<usize> {
        if self.v[0] == v {
            Some(self.v[1])
        } else if self.v[1] == v {
            Some(self.v[0])
        } else {
            None
        }
    }
}

impl From<Edge> for UEdge {
    fn from(e: Edge) -> Self {
        UEdge::new(e.v0, e.v1)
    }
}

/// Mesh triangle: three point indices plus the insertion handle `ind`.
///
/// Equality and hashing look at the vertex set only, so `(a,b,c)` equals
/// `(c,b,a)` whatever their handles.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Triangle {
    pub v: [usize; 3],
    pub ind: usize,
}

impl Triangle {
    pub fn new(v: [usize; 3], ind: usize) -> Self {
        Triangle { v, ind }
    }

    pub fn sorted(&self) -> [usize; 3] {
        let mut s = self.v;
        s.sort_unstable();
        s
    }

    pub fn is_degenerate(&self) -> bool {
        self.v[0] == self.v[1] || self.v[1] == self.v[2] || self.v[0] == self.v[2]
    }

    pub fn has_vertex(&self, v: usize) -> bool {
        self.v.contains(&v)
    }

    pub fn edges(&self) -> [Edge; 3] {
        [
            Edge::new(self.v[0], self.v[1]),
            Edge::new(self.v[1], self.v[2]),
            Edge::new(self.v[2], self.v[0]),
        ]
    }

    pub fn uedges(&self) -> [UEdge; 3] {
        self.edges().map(UEdge::from)
    }

    /// Vertex opposite `ue`, if `ue` is one of the triangle's edges.
    pub fn opposite(&self, ue: &UEdge) -> Option<usize> {
        if !(self.has_vertex(ue.v[0]) && self.has_vertex(ue.v[1])) {
            return None;
        }
        self.v.iter().copied().find(|&w| !ue.has_vertex(w))
    }

    /// Same handle, opposite winding.
    pub fn flipped(&self) -> Self {
        Triangle {
            v: [self.v[0], self.v[2], self.v[1]],
            ind: self.ind,
        }
    }
}

impl PartialEq for Triangle {
    fn eq(&self, other: &Self) -> bool {
        self.sorted() == other.sorted()
    }
}

impl Eq for Triangle {}

impl Hash for Triangle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_equality_ignores_order_and_handle() {
        let a = Triangle::new([1, 2, 3], 0);
        let b = Triangle::new([3, 2, 1], 7);
        assert_eq!(a, b);
        assert_ne!(a, Triangle::new([1, 2, 4], 0));
        assert_eq!(a.opposite(&UEdge::new(3, 1)), Some(2));
        assert_eq!(a.opposite(&UEdge::new(3, 4)), None);
    }
}
