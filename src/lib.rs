pub mod config;
pub mod dictionary;
pub mod error;
pub mod gram;
pub mod index;
pub mod merge;
pub mod search;

pub use config::{GramConfig, GramIdScheme, MergeConfig, TopKConfig};
pub use dictionary::{Dictionary, StringId};
pub use error::{GramdexError, Result};
pub use gram::{GramCodec, GramId};
pub use index::{IndexStats, InvertedIndex, PostingsList};
pub use merge::{merge, CancelToken, DivideSkipMerger, ListMerger, MergeOptMerger};
pub use search::{
    execute, range_search, top_k, top_k_scored, within_edit_distance, EditDistanceSimilarity,
    GramJaccard, NormalizedEditDistance, Query, QueryKind, QueryProfile, SearchHit,
    SimilarityMetric, TopKSelector,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
