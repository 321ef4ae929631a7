//! Safe-location discovery.
//!
//! [`is_safe`] judges one position; [`LocationSearcher`] samples random
//! chunks of a region until it finds a position that passes.

mod criteria;
mod safety;
mod searcher;

pub use criteria::{Area, ExclusionZone, PositionValidator, SafetyCriteria};
pub use safety::{HEADROOM, is_safe};
pub use searcher::{
    DEFAULT_MAX_ATTEMPTS, LocationSearcher, SCAN_MAX, SCAN_MIN, SearchError, SearchOptions,
};
