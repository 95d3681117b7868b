pub mod assignment;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod quantize;

pub use assignment::{
    Assignment, AssignmentSolver, CostMatrix, KuhnMunkres, ShortestAugmentingPath,
};
pub use error::{MatchError, Result};
pub use graph::{
    BipartiteMatcher, ConnectedComponents, HopcroftKarp, Subgraph, SubgraphExtractor,
};
pub use pipeline::{
    Callbacks, MatchCollector, MatchConsumer, MatchCounter, MatchingConfig, MatchingOrchestrator,
    chain, maximum_cardinality, minimum_distance, nearest_neighbour,
};
pub use quantize::{Quantizer, WeightedEdge};
