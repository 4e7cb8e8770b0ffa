//! # Faultloc Graph
//!
//! Best-effort static import graph at module granularity.
//!
//! ```text
//! ImportRef[] per module
//!     │
//!     ├──> Relative import → absolute dotted path
//!     ├──> Exact module, else longest known prefix, else dropped
//!     │
//!     └──> ImportGraph (petgraph)
//!            ├─ out_edges: modules imported
//!            └─ in_edges: modules importing
//! ```

mod builder;
mod types;

pub use builder::{ImportGraphBuilder, ModuleImports};
pub use types::{ImportGraph, ImportGraphDocument};
