//! Search Query Module
//!
//! Deterministic, invertible mapping between the search form's filter/sort/
//! pagination state and the URL query string, plus the page-number window
//! shown under the result grid.

mod filter;
mod pagination;

pub use filter::FilterQuery;
pub use pagination::{pagination_window, InvalidPageError, PageToken};
