//! Session boundary materialization (C1) and session-level tracking (C2).

pub mod boundary;
pub mod levels;

pub use boundary::{materialize, SessionBoundary};
pub use levels::{SessionLevels, SessionLevelsEngine, SessionLevelsSnapshot};
