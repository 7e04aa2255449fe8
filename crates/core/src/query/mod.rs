pub mod filter;
pub mod listing;

pub use filter::{Filter, FindOptions};
pub use listing::{distinct_values, unique_cemeteries, CemeteryListing, LISTING_LIMIT};

/// First comma-delimited segment of a free-text area, e.g. the city part of
/// `"Самбір, Львівська область"`.
pub fn area_head(area: &str) -> &str {
    area.split(',').next().unwrap_or(area).trim()
}
