pub mod cardinality;
pub mod components;

pub use cardinality::{BipartiteMatcher, HopcroftKarp};
pub use components::{ConnectedComponents, Subgraph, SubgraphExtractor};
