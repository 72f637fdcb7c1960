//! # filterhost
//!
//! A host for legacy native image-filter plugins (`.8bf` modules).
//!
//! filterhost finds filter modules on disk, reads their embedded resources
//! to learn what they are, and runs them against in-memory images through
//! the classic callback interface.
//!
//! ## Features
//!
//! - **Discovery**: PE architecture inspection and PiPL / PiMI / aete parsing
//!   without loading the module
//! - **Callback suites**: handles, buffers, descriptors, action descriptors,
//!   properties, resources, image services and color services
//! - **Execution**: the Parameters / Prepare / Start / Continue / Finish
//!   protocol with tiled delivery, padding and selection handling
//! - **Repeat runs**: parameter and global blocks persisted between runs
//! - **Out-of-process**: an rkyv byte contract for modules that need a
//!   helper process
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use filterhost::prelude::*;
//!
//! let config = HostConfig::default();
//! let catalog = PluginCatalog::scan("/opt/filters", &config)?;
//! let record = catalog.find("Blur", "Gaussian Blur").unwrap();
//!
//! let mut engine = FilterEngine::new(config);
//! let source = Surface::filled(640, 480, Bgra8::from_rgba(200, 100, 50, 255))?;
//! let outcome = engine.run(record, FilterImages::new(source), RunOptions::default())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod abi;
pub mod color;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod fourcc;
pub mod geometry;
pub mod observability;
pub mod plugin;
pub mod shim;
pub mod suites;
pub mod surface;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::HostConfig;
    pub use crate::discovery::{Architecture, LoadStrategy, PluginCatalog};
    pub use crate::engine::{FilterEngine, RunOptions, RunOutcome};
    pub use crate::error::{Error, Result};
    pub use crate::plugin::{FilterCase, PluginRecord};
    pub use crate::surface::{Bgra8, FilterImages, SelectionMask, Surface};
}

pub use error::{Error, Result};
