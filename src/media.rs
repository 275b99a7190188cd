//! Media reference scanning, classification, and fetching.

pub mod extract;
pub mod fetch;
pub mod patterns;

pub use extract::{DELIVERED_SENTINEL, MediaMatch, Outcome, ResponseSegment, extract, segment_response};
pub use fetch::{FetchMedia, MediaFetcher};
pub use patterns::MediaKind;
