//! Entoptic floater overlay
//!
//! A handful of translucent blobs drifting slowly across the frame,
//! simulating blue-field entoptic phenomena. Positions live on the CPU and
//! are shipped to the snow shader each frame as a uniform array.

use rand::Rng;

/// Maximum floaters the shader uniform block can carry.
pub const MAX_FLOATERS: usize = 8;

/// One drifting floater in normalized [0,1] screen coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Floater {
    pub pos: [f32; 2],
    pub radius: f32,
    pub opacity: f32,
    /// Per-floater phase offset so the blobs don't drift in lockstep.
    phase: f32,
}

/// The set of floaters for one session.
pub struct FloaterField {
    floaters: Vec<Floater>,
}

impl FloaterField {
    /// Scatter `count` floaters at random positions.
    pub fn new(count: usize) -> Self {
        let mut rng = rand::rng();
        let floaters = (0..count.min(MAX_FLOATERS))
            .map(|_| Floater {
                pos: [rng.random_range(0.15..0.85), rng.random_range(0.15..0.85)],
                radius: rng.random_range(0.01..0.035),
                opacity: rng.random_range(0.15..0.4),
                phase: rng.random_range(0.0..std::f32::consts::TAU),
            })
            .collect();
        Self { floaters }
    }

    /// Advance the slow sin/cos drift. Velocity amplitude is 0.2 units/s
    /// scaled by `dt`, matching the original floater motion.
    pub fn update(&mut self, time: f32, dt: f32) {
        for floater in &mut self.floaters {
            let t = time + floater.phase;
            let vx = (t * 0.5).sin() * 0.2;
            let vy = (t * 0.3).cos() * 0.2;
            floater.pos[0] = (floater.pos[0] + vx * dt).clamp(0.0, 1.0);
            floater.pos[1] = (floater.pos[1] + vy * dt).clamp(0.0, 1.0);
        }
    }

    pub fn floaters(&self) -> &[Floater] {
        &self.floaters
    }

    /// Pack into the shader's vec4 layout: xy = position, z = radius,
    /// w = opacity.
    pub fn packed(&self) -> ([[f32; 4]; MAX_FLOATERS], u32) {
        let mut out = [[0.0f32; 4]; MAX_FLOATERS];
        for (slot, floater) in out.iter_mut().zip(self.floaters.iter()) {
            *slot = [
                floater.pos[0],
                floater.pos[1],
                floater.radius,
                floater.opacity,
            ];
        }
        (out, self.floaters.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_capped_at_uniform_capacity() {
        let field = FloaterField::new(32);
        assert_eq!(field.floaters().len(), MAX_FLOATERS);
    }

    #[test]
    fn drift_moves_floaters_and_stays_in_bounds() {
        let mut field = FloaterField::new(4);
        let before: Vec<_> = field.floaters().iter().map(|f| f.pos).collect();

        let mut t = 0.0f32;
        for _ in 0..600 {
            field.update(t, 1.0 / 60.0);
            t += 1.0 / 60.0;
        }

        let mut moved = false;
        for (floater, old) in field.floaters().iter().zip(&before) {
            if floater.pos != *old {
                moved = true;
            }
            assert!((0.0..=1.0).contains(&floater.pos[0]));
            assert!((0.0..=1.0).contains(&floater.pos[1]));
        }
        assert!(moved);
    }

    #[test]
    fn packed_layout_matches_field() {
        let field = FloaterField::new(3);
        let (packed, count) = field.packed();
        assert_eq!(count, 3);
        for (slot, floater) in packed.iter().zip(field.floaters()) {
            assert_eq!(slot[0], floater.pos[0]);
            assert_eq!(slot[1], floater.pos[1]);
            assert_eq!(slot[2], floater.radius);
            assert_eq!(slot[3], floater.opacity);
        }
    }
}
