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

use brep_cdt::{
    CdtSession, CdtTolerances, RepairSettings,
    brep::primitives::block,
    geometry::Point3,
};

#[test]
fn empty_json_gives_defaults() {
    let t: CdtTolerances = serde_json::from_str("{}").unwrap();
    assert_eq!(t, CdtTolerances::default());
    let r: RepairSettings = serde_json::from_str("{}").unwrap();
    assert_eq!(r, RepairSettings::default());
}

#[test]
fn partial_json_keeps_remaining_defaults() {
    let t: CdtTolerances = serde_json::from_str(r#"{"abs": 0.5, "absmax": 2.0}"#).unwrap();
    assert_eq!(t.abs, 0.5);
    assert_eq!(t.absmax, 2.0);
    assert_eq!(t.rel, 0.01);
    assert_eq!(t.norm, 0.0);

    let r: RepairSettings = serde_json::from_str(r#"{"max_close_edge_iterations": 3}"#).unwrap();
    assert_eq!(r.max_close_edge_iterations, 3);
    assert_eq!(r.max_angle, 170.0);
    assert_eq!(r.normal_threshold, 0.1);
}

#[test]
fn settings_survive_a_json_round_trip() {
    let r = RepairSettings {
        max_angle: 120.0,
        ..RepairSettings::default()
    };
    let text = serde_json::to_string(&r).unwrap();
    assert_eq!(serde_json::from_str::<RepairSettings>(&text).unwrap(), r);
}

#[test]
fn disabling_proximity_rounds_leaves_thin_edges_whole() {
    let brep = block(Point3::new([0.0; 3]), Point3::new([1.0, 1.0, 0.1]));
    let settings = RepairSettings {
        max_close_edge_iterations: 0,
        ..RepairSettings::default()
    };
    let mut s = CdtSession::new(&brep, CdtTolerances::default()).with_settings(settings);
    s.prepare().unwrap();
    for e in 0..brep.edges.len() {
        assert_eq!(s.segments(e).count(), 1);
    }
}

#[test]
fn builders_feed_the_per_edge_bounds() {
    let t = CdtTolerances::default()
        .with_abs(0.1)
        .with_rel(0.05)
        .with_norm(0.3)
        .with_absmax(1.0);
    let ts = t.digest(10.0);
    assert_eq!(ts.max_dist, 1.0);
    assert_eq!(ts.min_dist, 0.5);
    assert_eq!(ts.within_dist, 0.1);
    assert!((ts.cos_within_ang - 0.3f64.cos()).abs() < 1e-15);
}
