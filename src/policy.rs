//! Record-mode decision table
//!
//! | Mode          | Match | Blank | Outcome |
//! |---------------|-------|-------|---------|
//! | `Once`        | yes   | any   | replay  |
//! | `Once`        | no    | yes   | record  |
//! | `Once`        | no    | no    | refuse  |
//! | `NewEpisodes` | yes   | any   | replay  |
//! | `NewEpisodes` | no    | any   | record  |
//! | `None`        | yes   | any   | replay  |
//! | `None`        | no    | any   | refuse  |
//! | `All`         | any   | any   | record  |
//!
//! `Once` looks at whether the file was absent when the session opened, not
//! at what has been appended since: a blank session keeps recording for its
//! whole lifetime, and the next session against the written file is locked.

use crate::config::RecordMode;

/// What to do with one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Serve the archived interaction at this index
    Replay(usize),
    /// Perform the real request and append it
    Record,
    /// Fail with `CannotRecord`
    Refuse,
}

/// Decide the outcome for a request
#[must_use]
pub fn decide(mode: RecordMode, found: Option<usize>, was_blank: bool) -> Decision {
    match (mode, found) {
        (RecordMode::All, _) => Decision::Record,
        (_, Some(index)) => Decision::Replay(index),
        (RecordMode::NewEpisodes, None) => Decision::Record,
        (RecordMode::Once, None) if was_blank => Decision::Record,
        (RecordMode::Once | RecordMode::None, None) => Decision::Refuse,
    }
}
