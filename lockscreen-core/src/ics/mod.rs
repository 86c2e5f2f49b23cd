//! iCalendar feed parsing.
//!
//! This module handles reading VEVENTs out of .ics feeds according to RFC 5545.

mod parse;

pub use parse::parse_feed;
