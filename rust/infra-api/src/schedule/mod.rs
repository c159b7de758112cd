//! Single-schedule resolution and targeting.
//!
//! - [`target`]: the host/site/region target of a schedule
//! - [`window`]: start/end validation and 32/64-bit conversion
//! - [`convert`]: external ↔ store mapping
//! - [`fieldmask`]: update masks
//! - [`service`]: the Create/Get/List/Update/Patch/Delete handlers

pub mod convert;
pub mod fieldmask;
pub mod service;
pub mod target;
pub mod window;

pub use service::{ScheduleService, ServiceSettings};
pub use target::Target;
pub use window::TimeWindow;
