//! Fairway Finder: find nearby golf driving ranges from the terminal.
//!
//! The user's location is resolved, Gemini (grounded with Google Maps) is
//! asked for a ranked list of ranges, and the normalized results are shown
//! as a list and a map.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod location;
pub mod logging;
pub mod map;
pub mod models;
pub mod normalize;
pub mod presenter;
pub mod search;
pub mod session;
pub mod ui;
