//! assetflow - Library for building front-end assets
//!
//! This library provides functionality to:
//! - Copy, compile, bundle and recompress assets through per-category pipelines
//! - Run the pipelines as an ordered, fail-fast production build
//! - Watch the sources, rebuild only what changed, and live-reload browsers

pub mod build;
pub mod category;
pub mod cli;
pub mod config;
pub mod server;
pub mod transforms;
pub mod watch;
