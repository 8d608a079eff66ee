/*!
 * Bag construction pipeline
 */

pub mod amend;
pub mod cleanup;
pub mod create;
pub mod fs_ops;
pub mod journal;
pub mod merge;
pub mod pipeline;
pub mod plan;
pub mod validation;

pub use merge::META_DIR;
pub use pipeline::{build, BagBuilder, BuildState, BuiltBag};
pub use plan::AlgorithmPlan;
