//! Outbound alert notifications.
//!
//! One capability, `send(alert)`, behind the [`AlertChannel`] trait, with
//! variant implementations selected by the closed [`ChannelKind`] enum at
//! construction time. The [`Dispatcher`] fans alerts out across enabled
//! subscriptions with per-channel failure isolation.

pub mod channel;
pub mod dispatcher;

pub use channel::{build_channel, AlertChannel, ChannelKind, NotifyError};
pub use dispatcher::Dispatcher;
