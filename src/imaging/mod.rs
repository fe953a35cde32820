//! Version generation: pure Rust, no system dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize** | Lanczos3 `resize_exact` |
//! | **Crop** | `resize_to_fill` (center crop) |
//! | **Encode** | JPEG, PNG, GIF, WebP, AVIF (rav1e) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a version
//! - **Backend**: [`ArtifactGenerator`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{ArtifactGenerator, BackendError, Dimensions};
pub use calculations::{VersionSize, calculate_version_dimensions};
pub use operations::{create_version, get_dimensions, plan_version};
pub use params::{Quality, VersionParams};
pub use rust_backend::{RustBackend, is_supported_source, supported_input_extensions};
