//! Filter-and-aggregation pipeline.
//!
//! Takes the full crash record set and the user's [`FilterCriteria`],
//! keeps the matching records, and derives the display views from that
//! subset only. Everything here is pure and synchronous.
//!
//! [`FilterCriteria`]: crate::record::FilterCriteria

pub mod derive;
pub mod filter;
pub mod options;
pub mod summary;
pub mod utility;
pub mod views;

pub use derive::{Views, derive_views};
pub use filter::filter;
pub use views::{
    CategoryCount, Coordinate, TimeSeries, centroid, coordinates, time_series, top_categories,
};
