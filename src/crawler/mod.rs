//! Recursive directory-listing crawler
//!
//! This module contains the core mirroring logic:
//! - the depth-first recursive walk over a remote listing tree
//! - tolerant link extraction and entry classification
//! - depth bounding, pacing, and path-safety enforcement

mod parser;
mod walker;

pub use parser::extract_links;
pub use walker::mirror_target;
