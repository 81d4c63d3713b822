//! Live event distribution.
//!
//! [`FeedEvent`] is the tagged-union wire shape pushed to observers;
//! [`LiveFeed`] is the in-process broadcast hub with last-progress replay
//! for late joiners.

pub mod feed;
pub mod hub;

pub use feed::{BenchmarkPhase, DriveInfo, FeedEvent};
pub use hub::{LiveFeed, ObserverHandle};
