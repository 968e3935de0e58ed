//! The chaos key: a deterministic, seedable pseudo-random generator.
//!
//! A [`ChaosKey`] is a single `u32` that is both seed and state. Every
//! output is a pure function of the construction seed and the number of
//! calls made, which is what effect replay and network-synced emitters
//! rely on. [`ChaosKeyLanes`] runs [`LANES`](mote_core::LANES) keys side
//! by side and reproduces, lane for lane, the exact bit sequence of the
//! scalar generator seeded identically.
//!
//! Float outputs are derived from the high bits of [`ChaosKey::advance`]:
//! 24 bits (the f32 mantissa width) for unit floats, so `rand_unorm` can
//! never round up to `1.0`.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use wide::{f32x4, i32x4, u32x4};

use crate::cbrt::CubeRootApprox;

const SCRAMBLE_XOR: u32 = 0x9E37_79B9;
const SCRAMBLE_MUL: u32 = 0x7FEB_352D;
const FORK_SALT: u32 = 0x85EB_CA6B;

/// 2^-24: one unit in the last place of a 24-bit fraction.
const UNORM_SCALE: f32 = 1.0 / 16_777_216.0;
/// 2^-23: scale of a signed 24-bit fraction.
const SNORM_SCALE: f32 = 1.0 / 8_388_608.0;

/// One step of the generator: an xorshift followed by a hash scramble.
///
/// Every stage is a bijection on `u32`, so distinct keys never collapse
/// onto the same successor.
#[inline]
fn mix(mut k: u32) -> u32 {
    k ^= k << 13;
    k ^= k >> 17;
    k ^= k << 5;
    let mut v = k ^ SCRAMBLE_XOR;
    v ^= v >> 16;
    v = v.wrapping_mul(SCRAMBLE_MUL);
    v ^= v >> 15;
    v
}

#[inline]
fn mix_lanes(k: u32x4) -> u32x4 {
    let k = k ^ (k << 13);
    let k = k ^ (k >> 17);
    let k = k ^ (k << 5);
    let v = k ^ u32x4::splat(SCRAMBLE_XOR);
    let v = v ^ (v >> 16);
    let v = v * u32x4::splat(SCRAMBLE_MUL);
    v ^ (v >> 15)
}

/// Scalar chaos key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChaosKey(u32);

impl ChaosKey {
    /// Create a key from a seed.
    pub const fn new(seed: u32) -> Self {
        Self(seed)
    }

    /// Current state.
    pub fn key(&self) -> u32 {
        self.0
    }

    /// Advance the key and return its new value.
    #[inline]
    pub fn advance(&mut self) -> u32 {
        self.0 = mix(self.0);
        self.0
    }

    /// An integer in `[0, range)`, or `0` when `range == 0`.
    ///
    /// Computed as `advance() % range`. For ranges that do not divide
    /// 2^32 this favors small results slightly (modulo bias); the bias
    /// is kept so authored effects reproduce bit-for-bit.
    #[inline]
    pub fn rand_ranged(&mut self, range: u32) -> u32 {
        let v = self.advance();
        if range == 0 {
            0
        } else {
            v % range
        }
    }

    /// A float in `[0, 1)`.
    #[inline]
    pub fn rand_unorm(&mut self) -> f32 {
        (self.advance() >> 8) as f32 * UNORM_SCALE
    }

    /// A float in `[-1, 1)`.
    #[inline]
    pub fn rand_snorm(&mut self) -> f32 {
        ((self.advance() as i32) >> 8) as f32 * SNORM_SCALE
    }

    /// A float in `[range.low(), range.high())`.
    #[inline]
    pub fn rand_in(&mut self, range: &ChaosRange) -> f32 {
        (self.advance() >> 8) as f32 * range.scale + range.bias
    }

    /// A uniformly distributed unit vector in the XY plane.
    pub fn rand_circle(&mut self) -> Vec2 {
        circle_point(self.rand_snorm() * PI)
    }

    /// A uniformly distributed point inside the unit disc.
    pub fn rand_disc(&mut self) -> Vec2 {
        let angle = self.rand_snorm() * PI;
        disc_point(angle, self.rand_unorm())
    }

    /// A uniformly distributed unit vector.
    pub fn rand_sphere(&mut self) -> Vec3 {
        let azimuth = self.rand_snorm();
        sphere_point(azimuth, self.rand_snorm())
    }

    /// A point inside the unit ball, radially distributed through `cbrt`.
    pub fn rand_ball(&mut self, cbrt: &CubeRootApprox) -> Vec3 {
        let azimuth = self.rand_snorm();
        let z = self.rand_snorm();
        ball_point(azimuth, z, self.rand_unorm(), cbrt)
    }

    /// Derive an independent child key, advancing this one once.
    pub fn fork(&mut self) -> ChaosKey {
        ChaosKey(mix(self.advance() ^ FORK_SALT))
    }
}

/// Precomputed affine map from the 24-bit output of a key to `[low, high)`.
///
/// Building the range once and reusing it keeps the per-sample cost to
/// one multiply-add.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChaosRange {
    scale: f32,
    bias: f32,
}

impl ChaosRange {
    /// Map onto `[low, high)`. `low > high` yields a reversed range.
    pub fn new(low: f32, high: f32) -> Self {
        Self {
            scale: (high - low) * UNORM_SCALE,
            bias: low,
        }
    }

    /// Lower bound.
    pub fn low(&self) -> f32 {
        self.bias
    }

    /// Upper bound.
    pub fn high(&self) -> f32 {
        self.bias + self.scale / UNORM_SCALE
    }
}

/// Point on the unit circle at `angle` radians.
#[inline]
pub fn circle_point(angle: f32) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(c, s)
}

/// Point in the unit disc at `angle`, at a radius whose square is
/// `radius_sq_sample` (uniform `[0, 1)` for an area-uniform distribution).
#[inline]
pub fn disc_point(angle: f32, radius_sq_sample: f32) -> Vec2 {
    circle_point(angle) * radius_sq_sample.sqrt()
}

/// Point on the unit sphere from two signed samples in `[-1, 1)`.
///
/// `azimuth_sample` sweeps a full turn; `z_sample` is the height, which
/// is uniform for a uniform sphere (Archimedes).
#[inline]
pub fn sphere_point(azimuth_sample: f32, z_sample: f32) -> Vec3 {
    let (s, c) = (azimuth_sample * PI).sin_cos();
    let r = (1.0 - z_sample * z_sample).max(0.0).sqrt();
    Vec3::new(c * r, s * r, z_sample)
}

/// Point inside the unit ball: a sphere point scaled by the approximate
/// cube root of `radius_sample`.
#[inline]
pub fn ball_point(
    azimuth_sample: f32,
    z_sample: f32,
    radius_sample: f32,
    cbrt: &CubeRootApprox,
) -> Vec3 {
    sphere_point(azimuth_sample, z_sample) * cbrt.eval(radius_sample)
}

/// [`LANES`](mote_core::LANES) chaos keys advanced in lock step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChaosKeyLanes {
    keys: u32x4,
}

impl ChaosKeyLanes {
    /// Seed each lane explicitly.
    pub fn from_lanes(seeds: [u32; 4]) -> Self {
        Self {
            keys: u32x4::new(seeds),
        }
    }

    /// Seed the lanes from consecutive outputs of a scalar key.
    pub fn from_key(key: &mut ChaosKey) -> Self {
        Self::from_lanes([key.advance(), key.advance(), key.advance(), key.advance()])
    }

    /// Current per-lane state.
    pub fn keys(&self) -> [u32; 4] {
        bytemuck::cast(self.keys)
    }

    /// Advance every lane and return the new values.
    #[inline]
    pub fn advance(&mut self) -> u32x4 {
        self.keys = mix_lanes(self.keys);
        self.keys
    }

    /// Per-lane integers in `[0, range)`, `0` when `range == 0`.
    ///
    /// Same modulo bias as [`ChaosKey::rand_ranged`].
    pub fn rand_ranged(&mut self, range: u32) -> [u32; 4] {
        let values: [u32; 4] = bytemuck::cast(self.advance());
        if range == 0 {
            return [0; 4];
        }
        values.map(|v| v % range)
    }

    /// Per-lane floats in `[0, 1)`.
    #[inline]
    pub fn rand_unorm(&mut self) -> f32x4 {
        let bits: i32x4 = bytemuck::cast(self.advance() >> 8);
        f32x4::from_i32x4(bits) * f32x4::splat(UNORM_SCALE)
    }

    /// Per-lane floats in `[-1, 1)`.
    #[inline]
    pub fn rand_snorm(&mut self) -> f32x4 {
        let bits: i32x4 = bytemuck::cast(self.advance());
        f32x4::from_i32x4(bits >> 8) * f32x4::splat(SNORM_SCALE)
    }

    /// Per-lane floats in `[range.low(), range.high())`.
    #[inline]
    pub fn rand_in(&mut self, range: &ChaosRange) -> f32x4 {
        let bits: i32x4 = bytemuck::cast(self.advance() >> 8);
        f32x4::from_i32x4(bits) * f32x4::splat(range.scale) + f32x4::splat(range.bias)
    }

    /// Per-lane unit circle points as `(x, y)`.
    pub fn rand_circle(&mut self) -> (f32x4, f32x4) {
        let angle = self.rand_snorm() * f32x4::splat(PI);
        let (s, c) = angle.sin_cos();
        (c, s)
    }

    /// Per-lane unit sphere points as `(x, y, z)`.
    pub fn rand_sphere(&mut self) -> (f32x4, f32x4, f32x4) {
        let azimuth = self.rand_snorm() * f32x4::splat(PI);
        let z = self.rand_snorm();
        let (s, c) = azimuth.sin_cos();
        let r = (f32x4::ONE - z * z).max(f32x4::ZERO).sqrt();
        (c * r, s * r, z)
    }
}
