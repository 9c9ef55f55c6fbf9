//! Core of calsync.
//!
//! This crate holds everything that does not talk to the network:
//! - `event`: feed events and calendar resources
//! - `day_class`, `window`, `matcher`, `reconcile`: the join between the two sides
//! - `sync`: one cycle, driven through the traits in `client`
//! - `ics`: feed parsing

pub mod client;
pub mod day_class;
pub mod error;
pub mod event;
pub mod ics;
pub mod matcher;
pub mod reconcile;
pub mod report;
pub mod sync;
pub mod window;

pub use client::{Authenticator, CalendarClient, FeedSource, Page};
pub use day_class::{DayClass, WeekdayZone};
pub use error::{SyncError, SyncResult};
pub use event::{DestinationEvent, SourceEvent};
pub use matcher::Compensation;
pub use report::CycleReport;
pub use sync::{SyncOptions, run_cycle};
pub use window::Window;
