//! Snowcam - visual snow simulator
//!
//! Captures a live webcam feed and overlays configurable "visual snow"
//! post-processing (grain, ghosting trails, halos, contrast grading and an
//! entoptic floater overlay), with an on-screen settings panel and persisted
//! user preferences.

pub mod app;
pub mod camera;
pub mod effects;
pub mod prefs;
pub mod ui;

pub use app::App;
