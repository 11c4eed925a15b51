//! Argus Composition
//!
//! Fan-out and fan-in of typology analyzers.
//!
//! # Core Concepts
//!
//! - [`AnalyzerRegistry`]: analyzers by name
//! - [`dispatch`]: plan -> runnable names, never empty
//! - [`run_parallel`]: bounded concurrent execution over a shared snapshot
//! - [`merge`]: key-wise union, collisions are consistency errors
//! - [`aggregate`]: order-independent summary
//! - [`AnalyzeStage`]: all of the above as one pipeline stage
//!
//! # Example
//!
//! ```rust,ignore
//! use argus_composition::{AnalyzeStage, AnalyzerRegistry};
//! use std::sync::Arc;
//!
//! let stage = AnalyzeStage::new(Arc::new(AnalyzerRegistry::with_defaults()), defaults, 8);
//! let update = stage.run(&record.project(stage.contract().reads)).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod aggregate;
mod analyze;
mod dispatch;
mod error;
mod fanout;
mod merge;
mod registry;

pub use aggregate::aggregate;
pub use analyze::AnalyzeStage;
pub use dispatch::dispatch;
pub use error::CompositionError;
pub use fanout::{run_parallel, FanOut};
pub use merge::merge;
pub use registry::AnalyzerRegistry;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
