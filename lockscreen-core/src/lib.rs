//! Core of the daily calendar lockscreen.
//!
//! A run reads the config, collects today's events from every calendar feed,
//! picks the background for the date, draws the event panel over it and puts
//! the JPEG under a fixed object key:
//! - `feed`, `ics` and `recurrence` turn feeds into the day's events
//! - `background` picks and crops the day's image
//! - `render` draws the panel
//! - `upload` stores the result
//! - `pipeline` ties them together

pub mod background;
pub mod config;
pub mod date_range;
pub mod error;
pub mod event;
pub mod feed;
pub mod ics;
pub mod pipeline;
pub mod recurrence;
pub mod render;
pub mod upload;

pub use config::Config;
pub use error::{LockscreenError, LockscreenResult};
pub use event::Event;
pub use pipeline::{Clock, RunReport};
