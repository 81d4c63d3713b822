//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods that
//! accept `&SqlitePool` as the first argument.

pub mod channel_repo;
pub mod drive_repo;
pub mod run_repo;
pub mod schedule_repo;
pub mod smart_cache_repo;
pub mod threshold_repo;

pub use channel_repo::ChannelRepo;
pub use drive_repo::DriveRepo;
pub use run_repo::RunRepo;
pub use schedule_repo::ScheduleRepo;
pub use smart_cache_repo::SmartCacheRepo;
pub use threshold_repo::ThresholdRepo;
