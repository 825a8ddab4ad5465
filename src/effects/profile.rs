//! Effect profile
//!
//! The full set of user-adjustable effect parameters, persisted as one
//! record. Field keys match the historical preference record; later-added
//! fields (contrast, the entoptic toggle) default instead of failing so old
//! records keep loading.

use serde::{Deserialize, Serialize};

use super::bridge::EffectParam;

/// User-adjustable effect parameters for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectProfile {
    /// Grain intensity, 0.0 - 1.0
    #[serde(rename = "Intensity", default = "default_intensity")]
    pub intensity: f32,

    /// Grain size, 0.3 - 3.0
    #[serde(rename = "Size", default = "default_size")]
    pub size: f32,

    /// Colored (RGB) grain vs monochrome
    #[serde(rename = "Color", default = "default_colored")]
    pub colored: bool,

    /// Flicker rate in Hz, 1 - 60. At 59+ the grain stops pulsing.
    #[serde(rename = "Flicker", default = "default_flicker_rate")]
    pub flicker_rate: f32,

    /// Ghosting trail amount, 0.0 - 1.0
    #[serde(rename = "Trail", default = "default_trail")]
    pub trail_amount: f32,

    /// Halo (bloom) amount, 0.0 - 30.0
    #[serde(rename = "Halo", default = "default_halo")]
    pub halo_amount: f32,

    /// Color-grading contrast, -100.0 - 100.0
    #[serde(rename = "Contrast", default = "default_contrast")]
    pub contrast: f32,

    /// Blue-field entoptic phenomena (floater) overlay
    #[serde(rename = "BFEP", default = "default_entoptic")]
    pub entoptic_enabled: bool,
}

impl EffectProfile {
    /// Clamp every scalar field to its declared range. Bound UI controls
    /// cannot go out of range, but a record on disk can; notably an
    /// out-of-range flicker rate feeds the timer directly rather than a
    /// layer, so nothing downstream would catch it.
    pub fn clamped(mut self) -> Self {
        self.intensity = EffectParam::Intensity.clamp(self.intensity);
        self.size = EffectParam::Size.clamp(self.size);
        self.flicker_rate = EffectParam::FlickerRate.clamp(self.flicker_rate);
        self.trail_amount = EffectParam::Trail.clamp(self.trail_amount);
        self.halo_amount = EffectParam::Halo.clamp(self.halo_amount);
        self.contrast = EffectParam::Contrast.clamp(self.contrast);
        self
    }
}

fn default_intensity() -> f32 {
    0.5
}

fn default_size() -> f32 {
    1.0
}

fn default_colored() -> bool {
    true
}

fn default_flicker_rate() -> f32 {
    60.0
}

fn default_trail() -> f32 {
    0.0
}

fn default_halo() -> f32 {
    0.0
}

fn default_contrast() -> f32 {
    0.0
}

fn default_entoptic() -> bool {
    false
}

impl Default for EffectProfile {
    fn default() -> Self {
        Self {
            intensity: default_intensity(),
            size: default_size(),
            colored: default_colored(),
            flicker_rate: default_flicker_rate(),
            trail_amount: default_trail(),
            halo_amount: default_halo(),
            contrast: default_contrast(),
            entoptic_enabled: default_entoptic(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_values() {
        let profile = EffectProfile {
            intensity: 0.73,
            size: 2.1,
            colored: false,
            flicker_rate: 12.0,
            trail_amount: 0.4,
            halo_amount: 18.5,
            contrast: -37.0,
            entoptic_enabled: true,
        };
        let json = serde_json::to_string(&profile).unwrap();
        let loaded: EffectProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn missing_newer_keys_fall_back_to_defaults() {
        // A record written before contrast and the BFEP toggle existed.
        let json = r#"{
            "Intensity": 0.9,
            "Size": 0.5,
            "Color": false,
            "Flicker": 3.0,
            "Trail": 0.2,
            "Halo": 5.0
        }"#;
        let loaded: EffectProfile = serde_json::from_str(json).unwrap();
        assert_eq!(loaded.intensity, 0.9);
        assert_eq!(loaded.contrast, 0.0);
        assert!(!loaded.entoptic_enabled);
    }

    #[test]
    fn empty_record_yields_builtin_defaults() {
        let loaded: EffectProfile = serde_json::from_str("{}").unwrap();
        assert_eq!(loaded, EffectProfile::default());
    }

    #[test]
    fn out_of_range_record_values_clamp_to_declared_ranges() {
        // Hand-edited record with values no slider can produce.
        let json = r#"{"Flicker": 0.2, "Size": 99.0, "Contrast": -500.0}"#;
        let loaded: EffectProfile = serde_json::from_str(json).unwrap();
        let profile = loaded.clamped();
        assert_eq!(profile.flicker_rate, 1.0);
        assert_eq!(profile.size, 3.0);
        assert_eq!(profile.contrast, -100.0);
    }

    #[test]
    fn in_range_values_survive_clamping() {
        let profile = EffectProfile {
            flicker_rate: 12.0,
            halo_amount: 18.5,
            ..EffectProfile::default()
        }
        .clamped();
        assert_eq!(profile.flicker_rate, 12.0);
        assert_eq!(profile.halo_amount, 18.5);
    }
}
