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

//! Closed analytic solids.

use std::{collections::BTreeMap, f64::consts::TAU};

use crate::geometry::{Plane, Point2, Point3, Vector3};

use super::{
    Brep,
    curve::{Arc2, Arc3, Line2, Line3},
    surface::{ConeSurface, CylinderSurface, PlaneSurface},
};

fn p2(u: f64, v: f64) -> Point2 {
    Point2::new([u, v])
}

fn axis(i: usize) -> Vector3 {
    let mut c = [0.0; 3];
    c[i] = 1.0;
    Vector3::new(c)
}

/// Line edges keyed by their unordered vertex pair, so each is created
/// once and both faces trim the same edge.
#[derive(Default)]
struct LineEdges(BTreeMap<(usize, usize), usize>);

impl LineEdges {
    /// Edge between `a` and `b` and whether `a -> b` runs against it.
    fn get(&mut self, brep: &mut Brep, a: usize, b: usize) -> (usize, bool) {
        let key = (a.min(b), a.max(b));
        if let Some(&e) = self.0.get(&key) {
            return (e, brep.edges[e].vertices[0] != a);
        }
        let (pa, pb) = (brep.vertices[a].point, brep.vertices[b].point);
        let e = brep.add_edge(Some(Box::new(Line3::new(pa, pb))), [a, b]);
        self.0.insert(key, e);
        (e, false)
    }
}

/// Axis-aligned box between two corners.
pub fn block(min: Point3, max: Point3) -> Brep {
    let mut b = Brep::new();
    let size = min.vector_to(&max);
    for i in 0..8 {
        let p = Point3::new([
            if i & 1 == 0 { min[0] } else { max[0] },
            if i & 2 == 0 { min[1] } else { max[1] },
            if i & 4 == 0 { min[2] } else { max[2] },
        ]);
        b.add_vertex(p);
    }

    // Origin corner and the two in-face axes, with du x dv outward.
    let faces: [(usize, usize, usize); 6] = [
        (0, 1, 0), // z min
        (4, 0, 1), // z max
        (0, 2, 1), // x min
        (1, 1, 2), // x max
        (0, 0, 2), // y min
        (2, 2, 0), // y max
    ];
    let mut edges = LineEdges::default();
    for (corner, du, dv) in faces {
        let corner_of = |a: usize, c: usize| corner + a * (1 << du) + c * (1 << dv);
        let quad = [corner_of(0, 0), corner_of(1, 0), corner_of(1, 1), corner_of(0, 1)];
        let (lu, lv) = (size[du], size[dv]);
        let uv = [p2(0.0, 0.0), p2(lu, 0.0), p2(lu, lv), p2(0.0, lv)];

        let Some(plane) = Plane::from_frame(b.vertices[corner].point, axis(du), axis(dv)) else {
            continue;
        };
        let f = b.add_face(Box::new(PlaneSurface::new(plane, (0.0, lu), (0.0, lv))), false);
        let l = b.add_loop(f);
        for i in 0..4 {
            let (va, vb) = (quad[i], quad[(i + 1) % 4]);
            let (e, rev) = edges.get(&mut b, va, vb);
            let curve = Line2::new(uv[i], uv[(i + 1) % 4]);
            b.add_trim(l, Box::new(curve), Some(e), rev, [va, vb]);
        }
    }
    b
}

/// Closed cylinder on the z axis with its base at the origin. The side
/// face is seamed along `x = radius, y = 0`.
pub fn cylinder(radius: f64, height: f64) -> Brep {
    let (x, y, z) = (axis(0), axis(1), axis(2));
    let mut b = Brep::new();
    let v0 = b.add_vertex(Point3::new([radius, 0.0, 0.0]));
    let v1 = b.add_vertex(Point3::new([radius, 0.0, height]));

    let origin = Point3::new([0.0, 0.0, 0.0]);
    let top = Point3::new([0.0, 0.0, height]);
    let e_bot = b.add_edge(Some(Box::new(Arc3::circle(origin, x, y, radius))), [v0, v0]);
    let e_top = b.add_edge(Some(Box::new(Arc3::circle(top, x, y, radius))), [v1, v1]);
    let e_seam = b.add_edge(
        Some(Box::new(Line3::new(b.vertices[v0].point, b.vertices[v1].point))),
        [v0, v1],
    );

    let side = b.add_face(
        Box::new(CylinderSurface {
            origin,
            x_axis: x,
            y_axis: y,
            axis: z,
            radius,
            height,
        }),
        false,
    );
    let l = b.add_loop(side);
    let line = |a: Point2, c: Point2| Box::new(Line2::new(a, c));
    b.add_trim(l, line(p2(0.0, 0.0), p2(TAU, 0.0)), Some(e_bot), false, [v0, v0]);
    b.add_trim(l, line(p2(TAU, 0.0), p2(TAU, height)), Some(e_seam), false, [v0, v1]);
    b.add_trim(l, line(p2(TAU, height), p2(0.0, height)), Some(e_top), true, [v1, v1]);
    b.add_trim(l, line(p2(0.0, height), p2(0.0, 0.0)), Some(e_seam), true, [v1, v0]);

    cap(&mut b, origin, -z, e_bot, v0, radius);
    cap(&mut b, top, z, e_top, v1, radius);
    b
}

/// Closed cone with its apex at the origin, opening along +z to `radius`
/// at `height`. The apex is a singular trim of the lateral face.
pub fn cone(radius: f64, height: f64) -> Brep {
    let (x, y, z) = (axis(0), axis(1), axis(2));
    let mut b = Brep::new();
    let apex = Point3::new([0.0, 0.0, 0.0]);
    let top = Point3::new([0.0, 0.0, height]);
    let va = b.add_vertex(apex);
    let vb = b.add_vertex(Point3::new([radius, 0.0, height]));

    let e_base = b.add_edge(Some(Box::new(Arc3::circle(top, x, y, radius))), [vb, vb]);
    let e_seam = b.add_edge(Some(Box::new(Line3::new(apex, b.vertices[vb].point))), [va, vb]);

    let side = b.add_face(
        Box::new(ConeSurface {
            apex,
            x_axis: x,
            y_axis: y,
            axis: z,
            radius,
            height,
        }),
        false,
    );
    let l = b.add_loop(side);
    let line = |a: Point2, c: Point2| Box::new(Line2::new(a, c));
    b.add_trim(l, line(p2(0.0, 0.0), p2(TAU, 0.0)), None, false, [va, va]);
    b.add_trim(l, line(p2(TAU, 0.0), p2(TAU, height)), Some(e_seam), false, [va, vb]);
    b.add_trim(l, line(p2(TAU, height), p2(0.0, height)), Some(e_base), true, [vb, vb]);
    b.add_trim(l, line(p2(0.0, height), p2(0.0, 0.0)), Some(e_seam), true, [vb, va]);

    cap(&mut b, top, z, e_base, vb, radius);
    b
}

/// Planar disk bounded by a circle edge lying in the xy directions at
/// `center`. The trim runs against the edge when the cap faces down.
fn cap(b: &mut Brep, center: Point3, normal: Vector3, edge: usize, vertex: usize, radius: f64) {
    let down = normal[2] < 0.0;
    let y = if down { -axis(1) } else { axis(1) };
    let Some(plane) = Plane::from_frame(center, axis(0), y) else {
        return;
    };
    let f = b.add_face(
        Box::new(PlaneSurface::new(plane, (-radius, radius), (-radius, radius))),
        false,
    );
    let l = b.add_loop(f);
    let trim = Arc2::circle(p2(0.0, 0.0), radius);
    b.add_trim(l, Box::new(trim), Some(edge), down, [vertex, vertex]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brep::Surface;

    #[test]
    fn block_faces_point_outward() {
        let b = block(Point3::new([0.0; 3]), Point3::new([1.0, 2.0, 3.0]));
        b.validate().unwrap();
        assert_eq!(b.edges.len(), 12);
        let center = Point3::new([0.5, 1.0, 1.5]);
        for f in &b.faces {
            let (u, v) = f.surface.domain();
            let p = f.surface.point_at(0.5 * (u.0 + u.1), 0.5 * (v.0 + v.1));
            let n = f.surface.normal_at(0.0, 0.0).unwrap();
            assert!(center.vector_to(&p).dot(&n) > 0.0);
        }
    }

    #[test]
    fn block_trims_follow_their_edges() {
        let b = block(Point3::new([0.0; 3]), Point3::new([1.0; 3]));
        for t in &b.trims {
            let Some(e) = t.edge else { continue };
            let ev = b.edges[e].vertices;
            let expect = if t.reversed { [ev[1], ev[0]] } else { ev };
            assert_eq!(t.vertices, expect);
        }
    }

    #[test]
    fn cylinder_and_cone_validate() {
        let c = cylinder(1.0, 2.0);
        c.validate().unwrap();
        assert_eq!(c.faces.len(), 3);
        assert_eq!(c.edges[2].trims.len(), 2);

        let k = cone(1.0, 2.0);
        k.validate().unwrap();
        assert!(k.trims.iter().any(|t| t.edge.is_none()));
    }
}
