//! Pure screening stages: window intersection, per-ticker enrichment,
//! rule scoring and result ordering. The pipeline wires them together.

pub mod consecutive;
pub mod enrich;
pub mod ranker;
pub mod scoring;

pub use consecutive::intersect;
pub use enrich::FundamentalsFetcher;
pub use ranker::rank;
pub use scoring::score;
