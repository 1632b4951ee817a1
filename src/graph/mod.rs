pub mod builder;
pub mod inject;
pub mod node;
pub mod sort;

pub use builder::{BuildError, build};
pub use inject::{InjectError, insert};
pub use node::{Graph, Node, NodeId};
pub use sort::{AggregateKey, SortKey};
