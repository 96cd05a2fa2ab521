//! Stroke geometry engine for freehand ink strokes
//!
//! Strokes are ordered polylines (or closed polygons) of points carrying
//! pressure, strength, color and UV attributes. This crate provides:
//! - [`types`] - Point, stroke and deform-weight data
//! - [`geometry`] - Derived data (fill triangles, bounds, UVs) and queries
//! - [`march`] / [`resample`] - Arc-length walking and uniform respacing
//! - [`smooth`] - Binomial-kernel smoothing of positions and attributes
//! - [`simplify`] - Error-bounded and fixed-stride point reduction
//! - [`edit`] - Trim, split, shrink, stretch, close, join, dissolve
//! - [`perimeter`] - Variable-width outlines with arc joins and caps
//! - [`flatten`] / [`triangulate`] - 2D projection and ear-clipping fill
//! - [`generate`] - Stroke points from poly, Bezier and NURBS curves
//! - [`frame`] - Frame and layer owners of strokes
//!
//! Settings for the tunable operations come from the `stroke-config` crate,
//! re-exported as [`stroke_config`].

pub mod constants;
pub mod edit;
pub mod flatten;
pub mod frame;
pub mod generate;
pub mod geometry;
pub mod list;
pub mod march;
pub mod perimeter;
pub mod resample;
pub mod simplify;
pub mod smooth;
pub mod tags;
pub mod triangulate;
pub mod types;
pub mod validation;

pub use constants::*;
pub use edit::*;
pub use flatten::*;
pub use frame::*;
pub use generate::*;
pub use list::*;
pub use march::*;
pub use perimeter::*;
pub use resample::*;
pub use simplify::*;
pub use smooth::*;
pub use tags::*;
pub use triangulate::*;
pub use types::*;
pub use validation::*;

pub use stroke_config;
