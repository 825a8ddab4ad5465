//! Settings panel visibility and focus mode

/// Logical identifiers for the panel's controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlId {
    Intensity,
    Size,
    Flicker,
    Trail,
    Halo,
    Contrast,
    Colored,
    Entoptic,
}

/// Settings surface state.
///
/// Exactly one of the panel and its entry-point button is visible once the
/// session has started; before that, only the start button shows. Focus mode
/// hides the panel background and zeroes sibling opacity while a single
/// control is held, so the user can see the video behind the slider they are
/// dragging.
#[derive(Debug, Default)]
pub struct SettingsPanel {
    open: bool,
    started: bool,
    focus: Option<ControlId>,
}

impl SettingsPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark that the user pressed start; the entry button becomes available.
    pub fn mark_started(&mut self) {
        self.started = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The "open settings" entry point shows exactly when the panel is
    /// hidden (and the session has started).
    pub fn entry_button_visible(&self) -> bool {
        self.started && !self.open
    }

    /// The start button shows only before the first start.
    pub fn start_button_visible(&self) -> bool {
        !self.started
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Close the panel. Closing is a deactivation of the whole surface, so
    /// it also exits focus mode; a lost pointer-up can never leave the
    /// panel transparent.
    pub fn close(&mut self) {
        self.open = false;
        self.focus = None;
    }

    /// Enter focus mode for one control (pointer-down on it).
    pub fn begin_focus(&mut self, control: ControlId) {
        if self.open {
            self.focus = Some(control);
        }
    }

    /// Exit focus mode (pointer-up).
    pub fn end_focus(&mut self) {
        self.focus = None;
    }

    pub fn focused(&self) -> Option<ControlId> {
        self.focus
    }

    /// Opacity the given control should render with this frame.
    pub fn control_opacity(&self, control: ControlId) -> f32 {
        match self.focus {
            Some(focused) if focused != control => 0.0,
            _ => 1.0,
        }
    }

    /// Whether the control accepts input this frame. Hidden siblings are
    /// inert, not just invisible; a stray tap during a drag must not toggle
    /// a control the user cannot see.
    pub fn control_interactive(&self, control: ControlId) -> bool {
        self.control_opacity(control) > 0.0
    }

    /// Whether the panel background should be drawn this frame.
    pub fn background_visible(&self) -> bool {
        self.focus.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CONTROLS: [ControlId; 8] = [
        ControlId::Intensity,
        ControlId::Size,
        ControlId::Flicker,
        ControlId::Trail,
        ControlId::Halo,
        ControlId::Contrast,
        ControlId::Colored,
        ControlId::Entoptic,
    ];

    fn assert_fully_restored(panel: &SettingsPanel) {
        assert!(panel.background_visible());
        for control in ALL_CONTROLS {
            assert_eq!(panel.control_opacity(control), 1.0);
        }
    }

    #[test]
    fn panel_and_entry_button_are_mutually_exclusive() {
        let mut panel = SettingsPanel::new();
        panel.mark_started();

        assert!(!panel.is_open());
        assert!(panel.entry_button_visible());

        panel.open();
        assert!(panel.is_open());
        assert!(!panel.entry_button_visible());

        panel.close();
        assert!(!panel.is_open());
        assert!(panel.entry_button_visible());
    }

    #[test]
    fn start_button_hides_after_first_start() {
        let mut panel = SettingsPanel::new();
        assert!(panel.start_button_visible());
        assert!(!panel.entry_button_visible());

        panel.mark_started();
        assert!(!panel.start_button_visible());
        assert!(panel.entry_button_visible());
    }

    #[test]
    fn focus_isolates_the_held_control() {
        let mut panel = SettingsPanel::new();
        panel.mark_started();
        panel.open();

        panel.begin_focus(ControlId::Trail);
        assert!(!panel.background_visible());
        assert_eq!(panel.control_opacity(ControlId::Trail), 1.0);
        for control in ALL_CONTROLS {
            if control != ControlId::Trail {
                assert_eq!(panel.control_opacity(control), 0.0);
            }
        }
    }

    #[test]
    fn pointer_up_restores_everything() {
        let mut panel = SettingsPanel::new();
        panel.mark_started();
        panel.open();

        for control in ALL_CONTROLS {
            panel.begin_focus(control);
            panel.end_focus();
            assert_fully_restored(&panel);
        }
    }

    #[test]
    fn panel_close_also_exits_focus() {
        // A lost pointer-up: the panel is deactivated while a control is
        // held. Reopening must show a fully restored panel.
        let mut panel = SettingsPanel::new();
        panel.mark_started();
        panel.open();
        panel.begin_focus(ControlId::Halo);

        panel.close();
        panel.open();
        assert_fully_restored(&panel);
    }

    #[test]
    fn hidden_siblings_are_inert() {
        let mut panel = SettingsPanel::new();
        panel.mark_started();
        panel.open();

        panel.begin_focus(ControlId::Size);
        assert!(panel.control_interactive(ControlId::Size));
        for control in ALL_CONTROLS {
            if control != ControlId::Size {
                assert!(!panel.control_interactive(control));
            }
        }

        panel.end_focus();
        for control in ALL_CONTROLS {
            assert!(panel.control_interactive(control));
        }
    }

    #[test]
    fn focus_requires_open_panel() {
        let mut panel = SettingsPanel::new();
        panel.mark_started();
        panel.begin_focus(ControlId::Intensity);
        assert_eq!(panel.focused(), None);
    }
}
