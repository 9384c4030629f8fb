//! Build pipeline module for assetflow
//!
//! Provides the core build system for turning a source tree into a
//! deployable build tree.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Discovery**: Find source files using the path table's glob patterns
//! - **Planning**: An ordered list of steps (clean, then one per category)
//! - **Execution**: Run steps in order, stopping at the first failure
//!
//! # Example
//!
//! ```ignore
//! use assetflow::build::{BuildContext, BuildPipeline};
//! use assetflow::config::load_config;
//!
//! let config = load_config(None)?;
//! let context = BuildContext::new(config, project_root);
//! let pipeline = BuildPipeline::new(context);
//!
//! let result = pipeline.build();
//! println!("{}", result.summary());
//! ```

pub mod clean;
pub mod context;
pub mod discovery;
pub mod pipeline;
pub mod result;
pub mod step;

pub use clean::*;
pub use context::*;
pub use discovery::*;
pub use pipeline::*;
pub use result::*;
pub use step::*;
