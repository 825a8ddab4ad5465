//! Effect parameter bridge
//!
//! Maps logical parameter names to post-processing layer slots. UI controls
//! talk to the bridge; the bridge clamps each value to the parameter's
//! declared range and writes it into the matching layer. A layer that is not
//! present in the active stack makes the write a silent no-op, so the UI can
//! carry controls for features the current profile doesn't support.

use bytemuck::{Pod, Zeroable};

use super::floaters::{FloaterField, MAX_FLOATERS};

/// Logical effect parameters exposed to the UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectParam {
    Intensity,
    Size,
    Trail,
    Halo,
    Contrast,
    FlickerRate,
}

impl EffectParam {
    /// Declared (min, max) range for this parameter.
    pub fn range(&self) -> (f32, f32) {
        match self {
            EffectParam::Intensity => (0.0, 1.0),
            EffectParam::Size => (0.3, 3.0),
            EffectParam::Trail => (0.0, 1.0),
            EffectParam::Halo => (0.0, 30.0),
            EffectParam::Contrast => (-100.0, 100.0),
            EffectParam::FlickerRate => (1.0, 60.0),
        }
    }

    /// Clamp a control value to the declared range. Bound controls already
    /// enforce the range; this guards values arriving from loaded records.
    pub fn clamp(&self, value: f32) -> f32 {
        let (min, max) = self.range();
        value.clamp(min, max)
    }
}

/// Film-grain layer parameters.
#[derive(Clone, Copy, Debug)]
pub struct GrainLayer {
    pub intensity: f32,
    pub size: f32,
    pub colored: bool,
}

impl Default for GrainLayer {
    fn default() -> Self {
        Self {
            intensity: 0.5,
            size: 1.0,
            colored: true,
        }
    }
}

/// Chromatic-aberration ghosting layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrailLayer {
    pub amount: f32,
}

/// Bloom halo layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct HaloLayer {
    pub amount: f32,
}

/// Color-grading contrast layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContrastLayer {
    pub contrast: f32,
}

/// Entoptic floater overlay layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct EntopticLayer {
    pub enabled: bool,
}

/// The post-processing stack for the active profile.
///
/// Each slot is optional: a `None` slot means the feature is absent and
/// parameter writes to it are dropped. Built once at init and injected into
/// the app, so nothing upstream depends on which layers exist.
#[derive(Debug, Default)]
pub struct LayerStack {
    pub grain: Option<GrainLayer>,
    pub trail: Option<TrailLayer>,
    pub halo: Option<HaloLayer>,
    pub contrast: Option<ContrastLayer>,
    pub entoptic: Option<EntopticLayer>,
}

impl LayerStack {
    /// Stack with every layer present (the shipping profile).
    pub fn full() -> Self {
        Self {
            grain: Some(GrainLayer::default()),
            trail: Some(TrailLayer::default()),
            halo: Some(HaloLayer::default()),
            contrast: Some(ContrastLayer::default()),
            entoptic: Some(EntopticLayer::default()),
        }
    }

    /// Write a scalar parameter, clamped to its declared range. Absent
    /// layers swallow the write.
    pub fn set(&mut self, param: EffectParam, value: f32) {
        let value = param.clamp(value);
        match param {
            EffectParam::Intensity => {
                if let Some(grain) = &mut self.grain {
                    grain.intensity = value;
                }
            }
            EffectParam::Size => {
                if let Some(grain) = &mut self.grain {
                    grain.size = value;
                }
            }
            EffectParam::Trail => {
                if let Some(trail) = &mut self.trail {
                    trail.amount = value;
                }
            }
            EffectParam::Halo => {
                if let Some(halo) = &mut self.halo {
                    halo.amount = value;
                }
            }
            EffectParam::Contrast => {
                if let Some(contrast) = &mut self.contrast {
                    contrast.contrast = value;
                }
            }
            // Flicker rate feeds the timer, not a layer; the bridge only
            // validates it.
            EffectParam::FlickerRate => {}
        }
    }

    /// Toggle colored vs monochrome grain.
    pub fn set_colored(&mut self, colored: bool) {
        if let Some(grain) = &mut self.grain {
            grain.colored = colored;
        }
    }

    /// Toggle the floater overlay.
    pub fn set_entoptic(&mut self, enabled: bool) {
        if let Some(entoptic) = &mut self.entoptic {
            entoptic.enabled = enabled;
        }
    }

    /// Base grain intensity, fed to the flicker timer each frame.
    pub fn grain_intensity(&self) -> f32 {
        self.grain.map(|g| g.intensity).unwrap_or(0.0)
    }

    /// Build the shader uniform block for this frame.
    ///
    /// `displayed_grain` is the flicker timer's output, which replaces the
    /// raw grain intensity on screen.
    pub fn snow_params(
        &self,
        time: f32,
        displayed_grain: f32,
        floaters: &FloaterField,
    ) -> SnowParams {
        let (floater_slots, floater_count) = floaters.packed();
        let entoptic_on = self.entoptic.map(|e| e.enabled).unwrap_or(false);

        SnowParams {
            time,
            grain_intensity: if self.grain.is_some() {
                displayed_grain
            } else {
                0.0
            },
            grain_size: self.grain.map(|g| g.size).unwrap_or(1.0),
            grain_colored: self
                .grain
                .map(|g| if g.colored { 1.0 } else { 0.0 })
                .unwrap_or(0.0),
            trail_amount: self.trail.map(|t| t.amount).unwrap_or(0.0),
            halo_amount: self.halo.map(|h| h.amount).unwrap_or(0.0),
            contrast: self.contrast.map(|c| c.contrast).unwrap_or(0.0),
            entoptic: if entoptic_on { 1.0 } else { 0.0 },
            floaters: floater_slots,
            floater_count: if entoptic_on { floater_count } else { 0 },
            _pad: [0; 3],
        }
    }
}

/// Uniform block for the snow post-processing pass.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SnowParams {
    pub time: f32,
    pub grain_intensity: f32,
    pub grain_size: f32,
    pub grain_colored: f32,
    pub trail_amount: f32,
    pub halo_amount: f32,
    pub contrast: f32,
    pub entoptic: f32,
    pub floaters: [[f32; 4]; MAX_FLOATERS],
    pub floater_count: u32,
    pub _pad: [u32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clamps_to_declared_range() {
        let mut stack = LayerStack::full();
        stack.set(EffectParam::Intensity, 2.5);
        assert_eq!(stack.grain.unwrap().intensity, 1.0);

        stack.set(EffectParam::Contrast, -500.0);
        assert_eq!(stack.contrast.unwrap().contrast, -100.0);

        stack.set(EffectParam::Halo, 12.0);
        assert_eq!(stack.halo.unwrap().amount, 12.0);
    }

    #[test]
    fn absent_layer_is_a_silent_no_op() {
        let mut stack = LayerStack {
            grain: Some(GrainLayer::default()),
            ..LayerStack::default()
        };
        stack.set(EffectParam::Trail, 0.8);
        stack.set(EffectParam::Halo, 9.0);
        stack.set_entoptic(true);
        assert!(stack.trail.is_none());
        assert!(stack.halo.is_none());
        assert!(stack.entoptic.is_none());
    }

    #[test]
    fn flicker_output_replaces_raw_intensity_in_uniform() {
        let mut stack = LayerStack::full();
        stack.set(EffectParam::Intensity, 1.0);

        let floaters = FloaterField::new(0);
        let params = stack.snow_params(0.0, 0.4, &floaters);
        assert_eq!(params.grain_intensity, 0.4);
    }

    #[test]
    fn entoptic_off_zeroes_floater_count() {
        let mut stack = LayerStack::full();
        let floaters = FloaterField::new(4);

        stack.set_entoptic(false);
        assert_eq!(stack.snow_params(0.0, 0.5, &floaters).floater_count, 0);

        stack.set_entoptic(true);
        assert_eq!(stack.snow_params(0.0, 0.5, &floaters).floater_count, 4);
    }

    #[test]
    fn uniform_block_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<SnowParams>() % 16, 0);
    }
}
