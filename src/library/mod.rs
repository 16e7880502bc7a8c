//! Local media library access

mod beets;
mod resolver;

use anyhow::Result;

pub use beets::BeetsLibrary;
pub use resolver::TrackResolver;

/// A queryable store of local track records keyed by file path
pub trait TrackLibrary {
    /// Every `(path, value)` pair for tracks that carry `attr`
    ///
    /// Paths are raw bytes as stored. Rows whose value is empty or `0` are
    /// not returned.
    fn paths_with_attribute(&self, attr: &str) -> Result<Vec<(Vec<u8>, String)>>;
}
