//! # lib-types
//!
//! Core type definitions for the ND2 reader workspace.
//!
//! This crate provides the plain types shared by the other crates:
//! - Named axes, axis sizes and coordinates
//! - Physical units (micrometers, milliseconds, Julian days)
//! - Decoded frames and per-frame metadata
//! - Owned snapshots of the file-level metadata records

pub mod axes;
pub mod frame;
pub mod metadata;
pub mod units;

pub use axes::*;
pub use frame::*;
pub use metadata::*;
pub use units::*;
