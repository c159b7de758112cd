//! External (API-facing) resource representations.
//!
//! These are the shapes callers send and receive. They mirror the public
//! protobuf schema, including its compatibility aliases, and are converted
//! to and from the internal store types in [`crate::schedule::convert`].

pub mod common;
pub mod compute;
pub mod location;
pub mod schedule;
pub mod services;

pub use common::Timestamps;
pub use compute::HostResource;
pub use location::{RegionResource, SiteResource};
pub use schedule::{ScheduleStatus, SingleScheduleResource};
