//! Request matching against an archive
//!
//! Matching is exact on URL and method: case-sensitive, no trailing-slash or
//! query-order normalization. Archives are test fixtures, so a linear scan is
//! all a lookup needs.

use crate::archive::{Archive, Interaction};

/// Whether an interaction was recorded for `url` and `method`
#[must_use]
pub fn matches(interaction: &Interaction, url: &str, method: &str) -> bool {
    interaction.request.url == url && interaction.request.method == method
}

/// Index of the first interaction matching `url` and `method`
///
/// Duplicates are allowed in an archive; the earliest recorded one wins.
#[must_use]
pub fn find(archive: &Archive, url: &str, method: &str) -> Option<usize> {
    archive
        .iter()
        .position(|interaction| matches(interaction, url, method))
}
