//! # lib-nd2-ffi
//!
//! Safe wrapper for the Nikon ND2 read SDK.
//!
//! This crate loads the vendor SDK at runtime and exposes ND2 files as
//! axis-addressed frame sources. It handles:
//!
//! - Dynamic library loading with `libloading`
//! - Byte-exact `repr(C)` mirrors of the SDK records
//! - Translation of SDK status codes into typed errors
//! - Ownership of file handles and decode buffers, released on drop
//!
//! # Safety
//!
//! The SDK is closed-source native code. Every call goes through a typed
//! wrapper in [`loader`]; picture storage is only ever handed to the SDK by
//! [`picture::DecodeBuffer`], and a closed reader never touches the SDK
//! again. The SDK itself gives no thread-safety guarantees, so a reader is
//! `Send` but not `Sync`.

pub mod error;
pub mod loader;
pub mod picture;
pub mod reader;
pub mod records;
pub mod wide;

pub use error::{LimStatus, Nd2Error, Nd2Result};
pub use loader::{LimFunctions, Nd2Library, LIBRARY_PATH_ENV};
pub use reader::{is_nd2_path, Nd2Reader, ReaderOptions, ReaderState, Region, StretchMode};
