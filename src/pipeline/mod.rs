pub mod config;
pub mod consumer;
pub mod matching;

pub use config::MatchingConfig;
pub use consumer::{Callbacks, Chain, MatchCollector, MatchConsumer, MatchCounter, chain};
pub use matching::{
    MatchingOrchestrator, maximum_cardinality, minimum_distance, nearest_neighbour,
};
