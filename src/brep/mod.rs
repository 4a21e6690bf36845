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

//! Boundary-representation input model.
//!
//! Indices link the tables together: edges name their vertices, trims name
//! their edge and loop, loops name their face. A face's first loop is its
//! outer loop.

pub mod curve;
pub mod primitives;
pub mod surface;

pub use curve::{Arc2, Arc3, Curve2, Curve3, Line2, Line3, curve_closest_param};
pub use surface::{ConeSurface, CylinderSurface, PlaneSurface, Surface};

use crate::{
    error::{CdtError, CdtResult},
    geometry::Point3,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrepVertex {
    pub point: Point3,
}

#[derive(Debug)]
pub struct BrepEdge {
    /// `None` for a singular edge.
    pub curve: Option<Box<dyn Curve3>>,
    /// Start and end vertex; equal for a closed curve.
    pub vertices: [usize; 2],
    pub trims: Vec<usize>,
}

#[derive(Debug)]
pub struct BrepTrim {
    pub curve: Box<dyn Curve2>,
    /// `None` for a trim along a surface singularity.
    pub edge: Option<usize>,
    pub loop_index: usize,
    /// The trim runs against its edge's parameter direction.
    pub reversed: bool,
    /// Start and end vertex in trim direction.
    pub vertices: [usize; 2],
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrepLoop {
    pub face: usize,
    pub trims: Vec<usize>,
}

#[derive(Debug)]
pub struct BrepFace {
    pub surface: Box<dyn Surface>,
    pub loops: Vec<usize>,
    /// The face normal opposes the surface normal.
    pub reversed: bool,
}

#[derive(Debug, Default)]
pub struct Brep {
    pub vertices: Vec<BrepVertex>,
    pub edges: Vec<BrepEdge>,
    pub trims: Vec<BrepTrim>,
    pub loops: Vec<BrepLoop>,
    pub faces: Vec<BrepFace>,
}

impl Brep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, point: Point3) -> usize {
        self.vertices.push(BrepVertex { point });
        self.vertices.len() - 1
    }

    pub fn add_edge(&mut self, curve: Option<Box<dyn Curve3>>, vertices: [usize; 2]) -> usize {
        self.edges.push(BrepEdge {
            curve,
            vertices,
            trims: Vec::new(),
        });
        self.edges.len() - 1
    }

    pub fn add_face(&mut self, surface: Box<dyn Surface>, reversed: bool) -> usize {
        self.faces.push(BrepFace {
            surface,
            loops: Vec::new(),
            reversed,
        });
        self.faces.len() - 1
    }

    /// Appends a loop to `face`. The first loop added is the outer one.
    pub fn add_loop(&mut self, face: usize) -> usize {
        let li = self.loops.len();
        self.loops.push(BrepLoop {
            face,
            trims: Vec::new(),
        });
        if let Some(f) = self.faces.get_mut(face) {
            f.loops.push(li);
        }
        li
    }

    /// Appends a trim to `loop_index`, registering it with its edge.
    pub fn add_trim(
        &mut self,
        loop_index: usize,
        curve: Box<dyn Curve2>,
        edge: Option<usize>,
        reversed: bool,
        vertices: [usize; 2],
    ) -> usize {
        let ti = self.trims.len();
        self.trims.push(BrepTrim {
            curve,
            edge,
            loop_index,
            reversed,
            vertices,
        });
        if let Some(l) = self.loops.get_mut(loop_index) {
            l.trims.push(ti);
        }
        if let Some(e) = edge.and_then(|e| self.edges.get_mut(e)) {
            e.trims.push(ti);
        }
        ti
    }

    pub fn face_of_trim(&self, trim: usize) -> Option<usize> {
        let t = self.trims.get(trim)?;
        Some(self.loops.get(t.loop_index)?.face)
    }

    /// Edges touching `vertex`.
    pub fn vertex_edges(&self, vertex: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.vertices.contains(&vertex))
            .map(|(i, _)| i)
    }

    /// Checks index ranges and edge/trim multiplicity.
    pub fn validate(&self) -> CdtResult<()> {
        let bad = |msg: String| Err(CdtError::InvalidTopology(msg));
        let nv = self.vertices.len();

        for (i, e) in self.edges.iter().enumerate() {
            if e.vertices.iter().any(|&v| v >= nv) {
                return bad(format!("edge {i} references a missing vertex"));
            }
            if e.trims.len() > 2 {
                return Err(CdtError::TooManyTrims {
                    edge: i,
                    count: e.trims.len(),
                });
            }
            if e.curve.is_some() && e.trims.len() < 2 {
                return bad(format!("edge {i} has {} trims", e.trims.len()));
            }
        }
        for (i, t) in self.trims.iter().enumerate() {
            if t.loop_index >= self.loops.len() {
                return bad(format!("trim {i} references a missing loop"));
            }
            if t.vertices.iter().any(|&v| v >= nv) {
                return bad(format!("trim {i} references a missing vertex"));
            }
            match t.edge {
                Some(e) if e >= self.edges.len() => {
                    return bad(format!("trim {i} references a missing edge"));
                }
                Some(e) if !self.edges[e].trims.contains(&i) => {
                    return bad(format!("trim {i} is not registered with edge {e}"));
                }
                _ => {}
            }
        }
        for (i, l) in self.loops.iter().enumerate() {
            if l.face >= self.faces.len() {
                return bad(format!("loop {i} references a missing face"));
            }
            if l.trims.is_empty() {
                return bad(format!("loop {i} is empty"));
            }
            if l.trims.iter().any(|&t| self.trims.get(t).is_none_or(|tr| tr.loop_index != i)) {
                return bad(format!("loop {i} has a foreign trim"));
            }
        }
        for (i, f) in self.faces.iter().enumerate() {
            if f.loops.is_empty() {
                return bad(format!("face {i} has no loops"));
            }
            if f.loops.iter().any(|&l| self.loops.get(l).is_none_or(|lp| lp.face != i)) {
                return bad(format!("face {i} has a foreign loop"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2;

    #[test]
    fn third_trim_on_an_edge_is_rejected() {
        let mut b = primitives::block(Point3::new([0.0; 3]), Point3::new([1.0; 3]));
        assert!(b.validate().is_ok());
        let l = b.loops.len() - 1;
        let curve = Box::new(Line2::new(Point2::new([0.0, 0.0]), Point2::new([1.0, 0.0])));
        b.add_trim(l, curve, Some(0), false, b.edges[0].vertices);
        assert_eq!(
            b.validate(),
            Err(CdtError::TooManyTrims { edge: 0, count: 3 })
        );
    }
}
