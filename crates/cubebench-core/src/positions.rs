//! Deterministic object positions shared by every strategy.

use glam::Vec3;
use rand::distr::{Distribution, Uniform};
use rand_pcg::Pcg32;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_CAP: usize = 50_000;
pub const DEFAULT_HALF_EXTENT: f32 = 10.0;

/// PCG stream selector; fixed so that only the seed varies between runs.
const POSITION_STREAM: u64 = 54;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PositionParams {
    pub seed: u64,
    pub cap: usize,
    pub half_extent: f32,
}

impl Default for PositionParams {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            cap: DEFAULT_CAP,
            half_extent: DEFAULT_HALF_EXTENT,
        }
    }
}

/// `cap` positions drawn uniformly from the cube `[-h, h)^3`.
///
/// The same parameters always give a bit-identical sequence. Each position takes
/// three consecutive samples in x, y, z order.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancePositionSet {
    params: PositionParams,
    positions: Vec<Vec3>,
}

impl InstancePositionSet {
    pub fn generate(params: PositionParams) -> Self {
        let h = params.half_extent;
        let dist = match Uniform::new(-h, h) {
            Ok(dist) => dist,
            Err(err) => {
                log::error!("invalid position half extent {h}: {err}");
                return Self {
                    params,
                    positions: Vec::new(),
                };
            }
        };

        let mut rng = Pcg32::new(params.seed, POSITION_STREAM);
        let positions = (0..params.cap)
            .map(|_| {
                let x = dist.sample(&mut rng);
                let y = dist.sample(&mut rng);
                let z = dist.sample(&mut rng);
                Vec3::new(x, y, z)
            })
            .collect();

        Self { params, positions }
    }

    pub fn params(&self) -> PositionParams {
        self.params
    }

    /// Number of positions available.
    #[inline]
    pub fn cap(&self) -> usize {
        self.positions.len()
    }

    /// Clamps a requested object count to `0..=cap`.
    #[inline]
    pub fn clamp(&self, count: usize) -> usize {
        count.min(self.cap())
    }

    pub fn all(&self) -> &[Vec3] {
        &self.positions
    }

    /// The first `count` positions, clamped to the cap.
    pub fn visible(&self, count: usize) -> &[Vec3] {
        &self.positions[..self.clamp(count)]
    }

    /// Tightly packed `vec3<f32>` stream of every position.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(v: Vec3) -> [u32; 3] {
        v.to_array().map(f32::to_bits)
    }

    #[test]
    fn default_sequence_is_pinned() {
        let set = InstancePositionSet::generate(PositionParams::default());
        assert_eq!(set.cap(), 50_000);
        // (2.6062031, -0.36866665, 4.540159)
        assert_eq!(bits(set.all()[0]), [0x4026cc08, 0xbebcc1e0, 0x409148fc]);
        assert_eq!(bits(set.all()[1]), [0x3e98f5c0, 0x409f1b2c, 0x40bdd170]);
        assert_eq!(bits(set.all()[49_999]), [0xc0929f4b, 0x40c92e7c, 0xbff19e70]);
    }

    #[test]
    fn generation_is_deterministic() {
        let params = PositionParams {
            cap: 1000,
            ..PositionParams::default()
        };
        let a = InstancePositionSet::generate(params);
        let b = InstancePositionSet::generate(params);
        assert_eq!(a.as_bytes(), b.as_bytes());

        let other = InstancePositionSet::generate(PositionParams { seed: 7, ..params });
        assert_ne!(a.as_bytes(), other.as_bytes());
    }

    #[test]
    fn shorter_cap_is_a_prefix() {
        let long = InstancePositionSet::generate(PositionParams::default());
        let short = InstancePositionSet::generate(PositionParams {
            cap: 10,
            ..PositionParams::default()
        });
        assert_eq!(short.all(), &long.all()[..10]);
    }

    #[test]
    fn positions_stay_inside_half_extent() {
        let set = InstancePositionSet::generate(PositionParams::default());
        assert!(
            set.all()
                .iter()
                .all(|p| p.abs().max_element() < DEFAULT_HALF_EXTENT)
        );
    }

    #[test]
    fn counts_are_clamped() {
        let set = InstancePositionSet::generate(PositionParams {
            cap: 100,
            ..PositionParams::default()
        });
        assert_eq!(set.clamp(1100), 100);
        assert_eq!(set.visible(1100).len(), 100);
        assert_eq!(set.visible(0).len(), 0);
    }

    #[test]
    fn invalid_extent_yields_empty_set() {
        let set = InstancePositionSet::generate(PositionParams {
            half_extent: 0.0,
            ..PositionParams::default()
        });
        assert_eq!(set.cap(), 0);
        assert_eq!(set.clamp(10), 0);
    }
}
