//! iCal feed parsing.
//!
//! Turns the body of a subscribed feed into `SourceEvent`s. Only VEVENT
//! components are kept; timezone definitions and other components are dropped.

mod parse;

pub use parse::parse_feed;
