mod client;
mod config;
mod coordinator;
mod document;
pub mod entity;
mod error;
mod limits;
mod logger;
mod merge;
mod schedule;
mod token;

pub use client::{OnectaClient, DEFAULT_BASE_URL};
pub use config::ScheduleConfig;
pub use coordinator::{DeviceCoordinator, DeviceCoordinatorBuilder, PollOutcome};
pub use document::{
    Characteristic, ConsumptionKind, ConsumptionPeriod, Device, ManagementPoint, Ranged, Scalar,
    Structured, TimeSeries,
};
pub use error::{Error, Result};
pub use limits::RateLimitSnapshot;
pub use logger::MessageLogMode;
pub use merge::{changed_paths, merge_tree};
pub use schedule::{in_window, next_interval, next_interval_now, should_skip};
pub use token::{StaticTokenProvider, TokenProvider};
