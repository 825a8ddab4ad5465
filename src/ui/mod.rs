//! Settings UI state
//!
//! Visibility of the settings panel, its entry-point button, and the focus
//! mode that isolates one control while it is being dragged. All of it is
//! explicit state read by the egui layer each frame, so there is no
//! hierarchy trickery and every entered state has a guaranteed exit.

pub mod panel;

pub use panel::{ControlId, SettingsPanel};
