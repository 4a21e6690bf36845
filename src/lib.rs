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

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

//! Constrained Delaunay tessellation and local mesh repair for B-rep faces.
//!
//! A [`cdt::CdtSession`] takes a [`brep::Brep`] through the shared-edge
//! subdivision pipeline, triangulates every face into a [`mesh::CdtMesh`]
//! and repairs the inverted or non-manifold patches left behind.

pub mod brep;
pub mod cdt;
pub mod edge;
pub mod error;
pub mod geometry;
pub mod kernel;
pub mod mesh;
pub mod operations;
pub mod polygon;

pub use cdt::{CdtSession, CdtTolerances, FaceReport, FaceStatus, RepairSettings, TessellationReport, ToleranceSet};
pub use error::{CdtError, CdtResult};
pub use mesh::CdtMesh;
