//! Effects module
//!
//! The visual snow post-processing stack: parameter bridge, flicker timing,
//! the persisted effect profile and the entoptic floater overlay. GPU work
//! stays in the app's render pass; everything here is plain state.

pub mod bridge;
pub mod flicker;
pub mod floaters;
pub mod profile;

pub use bridge::{EffectParam, LayerStack, SnowParams};
pub use flicker::FlickerTimer;
pub use floaters::FloaterField;
pub use profile::EffectProfile;

use crate::effects::bridge::EffectParam::*;

/// Push every profile value through the bridge, as done at startup and when
/// a saved record is loaded.
pub fn apply_profile(stack: &mut LayerStack, profile: &EffectProfile) {
    stack.set(Intensity, profile.intensity);
    stack.set(Size, profile.size);
    stack.set(Trail, profile.trail_amount);
    stack.set(Halo, profile.halo_amount);
    stack.set(Contrast, profile.contrast);
    stack.set_colored(profile.colored);
    stack.set_entoptic(profile.entoptic_enabled);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_profile_writes_every_layer() {
        let mut stack = LayerStack::full();
        let profile = EffectProfile {
            intensity: 0.25,
            size: 2.0,
            colored: false,
            flicker_rate: 10.0,
            trail_amount: 0.6,
            halo_amount: 7.5,
            contrast: 40.0,
            entoptic_enabled: true,
        };
        apply_profile(&mut stack, &profile);

        assert_eq!(stack.grain.unwrap().intensity, 0.25);
        assert_eq!(stack.grain.unwrap().size, 2.0);
        assert!(!stack.grain.unwrap().colored);
        assert_eq!(stack.trail.unwrap().amount, 0.6);
        assert_eq!(stack.halo.unwrap().amount, 7.5);
        assert_eq!(stack.contrast.unwrap().contrast, 40.0);
        assert!(stack.entoptic.unwrap().enabled);
    }

    #[test]
    fn loaded_out_of_range_values_are_clamped() {
        let mut stack = LayerStack::full();
        let profile = EffectProfile {
            size: 99.0,
            ..EffectProfile::default()
        };
        apply_profile(&mut stack, &profile);
        assert_eq!(stack.grain.unwrap().size, 3.0);
    }

    #[test]
    fn clamped_flicker_rate_keeps_the_period_in_range() {
        // A record with a sub-range rate would otherwise stretch one phase
        // over seconds; clamped to the 1 Hz floor the phase flips within a
        // second.
        let loaded: EffectProfile = serde_json::from_str(r#"{"Flicker": 0.2}"#).unwrap();
        let profile = loaded.clamped();
        assert_eq!(profile.flicker_rate, 1.0);

        let mut timer = FlickerTimer::new();
        let first = timer.tick(0.0, profile.flicker_rate as f64, 1.0);
        let later = timer.tick(1.0, profile.flicker_rate as f64, 1.0);
        assert_ne!(first, later);
    }
}
