//! Shared utility functions for swipejury.

pub mod json_extraction;

pub use json_extraction::{extract_json_from_response, find_matching_brace};
