//! Cubic spline curves for per-particle attribute animation.
//!
//! A [`Spline`] stores one precomputed key per authored point. Each key
//! carries the reciprocal of its segment length and two shape
//! coefficients, so evaluating a segment costs one subtract, one
//! multiply and a handful of multiply-adds:
//!
//! ```text
//! t = (time - k0.time) * k0.time_mult      u = 1 - t
//! v = v0*u + v1*t + (c0*u + c1*t) * t*u
//! ```
//!
//! With `c0 = c1 = 0` a segment is the straight line between its keys.
//! The cached value range is exact: interior extrema are found from the
//! roots of the segment derivative.

use smallvec::SmallVec;
use wide::{f32x4, CmpGe};

use glam::Vec3;

/// Inline key capacity before a spline spills to the heap.
const INLINE_KEYS: usize = 8;

/// An authored key: a value at a time, with incoming and outgoing slopes
/// (value units per time unit).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SourceKey {
    /// Key time.
    pub time: f32,
    /// Value at `time`.
    pub value: f32,
    /// Slope arriving at this key.
    pub in_tangent: f32,
    /// Slope leaving this key.
    pub out_tangent: f32,
}

impl SourceKey {
    /// A key with flat tangents.
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
        }
    }

    /// A key with explicit tangents.
    pub fn with_tangents(time: f32, value: f32, in_tangent: f32, out_tangent: f32) -> Self {
        Self {
            time,
            value,
            in_tangent,
            out_tangent,
        }
    }
}

/// A precomputed key. The coefficients describe the segment starting
/// here; they are zero on the last key.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SplineKey {
    /// Key time.
    pub time: f32,
    /// Value at `time`.
    pub value: f32,
    /// `1 / segment length`, `0` for an empty segment.
    pub time_mult: f32,
    /// Shape coefficient at the segment start.
    pub coeff0: f32,
    /// Shape coefficient at the segment end.
    pub coeff1: f32,
}

impl SplineKey {
    #[inline]
    fn eval(&self, next: &SplineKey, time: f32) -> f32 {
        self.eval_normalized(next, (time - self.time) * self.time_mult)
    }

    #[inline]
    fn eval_normalized(&self, next: &SplineKey, t: f32) -> f32 {
        let u = 1.0 - t;
        self.value * u + next.value * t + (self.coeff0 * u + self.coeff1 * t) * t * u
    }

    #[inline]
    fn eval_lanes(&self, next: &SplineKey, time: f32x4) -> f32x4 {
        let t = (time - f32x4::splat(self.time)) * f32x4::splat(self.time_mult);
        let u = f32x4::ONE - t;
        f32x4::splat(self.value) * u
            + f32x4::splat(next.value) * t
            + (f32x4::splat(self.coeff0) * u + f32x4::splat(self.coeff1) * t) * t * u
    }
}

/// A piecewise cubic curve over time.
///
/// Evaluation clamps: times before the first key return its value,
/// times at or after the last key return the last value.
#[derive(Clone, Debug, PartialEq)]
pub struct Spline {
    keys: SmallVec<[SplineKey; INLINE_KEYS]>,
    range: (f32, f32),
}

impl Spline {
    /// A constant curve.
    pub fn flat(value: f32) -> Self {
        let mut keys = SmallVec::new();
        keys.push(SplineKey {
            value,
            ..SplineKey::default()
        });
        Self {
            keys,
            range: (value, value),
        }
    }

    /// A straight line from `v0` at time `0` to `v1` at time `1`.
    pub fn linear(v0: f32, v1: f32) -> Self {
        let mut spline = Self::flat(v0);
        spline.set_linear(v0, v1);
        spline
    }

    /// Replace the curve by a straight line from `v0` at `0` to `v1` at `1`.
    pub fn set_linear(&mut self, v0: f32, v1: f32) {
        self.keys.clear();
        self.keys.push(SplineKey {
            time: 0.0,
            value: v0,
            time_mult: 1.0,
            coeff0: 0.0,
            coeff1: 0.0,
        });
        self.keys.push(SplineKey {
            time: 1.0,
            value: v1,
            ..SplineKey::default()
        });
        self.range = (v0.min(v1), v0.max(v1));
    }

    /// Rebuild from authored keys, in any order.
    ///
    /// Keys are sorted by time (stable, so coincident keys keep their
    /// authored order). A single key gives a constant curve at its value
    /// and no key at all gives a constant `1.0`.
    pub fn rebuild_from(&mut self, source: &[SourceKey]) {
        if source.len() < 2 {
            let value = source.first().map_or(1.0, |k| k.value);
            *self = Self::flat(value);
            if let Some(k) = source.first() {
                self.keys[0].time = k.time;
            }
            return;
        }

        let mut sorted: SmallVec<[SourceKey; INLINE_KEYS]> = source.iter().copied().collect();
        sorted.sort_by(|a, b| a.time.total_cmp(&b.time));

        self.keys.clear();
        for pair in sorted.windows(2) {
            let (k0, k1) = (&pair[0], &pair[1]);
            let dt = k1.time - k0.time;
            let dv = k1.value - k0.value;
            let key = if dt > 0.0 {
                SplineKey {
                    time: k0.time,
                    value: k0.value,
                    time_mult: 1.0 / dt,
                    coeff0: k0.out_tangent * dt - dv,
                    coeff1: dv - k1.in_tangent * dt,
                }
            } else {
                SplineKey {
                    time: k0.time,
                    value: k0.value,
                    ..SplineKey::default()
                }
            };
            self.keys.push(key);
        }
        if let Some(last) = sorted.last() {
            self.keys.push(SplineKey {
                time: last.time,
                value: last.value,
                ..SplineKey::default()
            });
        }
        self.range = self.compute_range();
    }

    /// Build a spline from authored keys.
    pub fn from_keys(source: &[SourceKey]) -> Self {
        let mut spline = Self::default();
        spline.rebuild_from(source);
        spline
    }

    /// Evaluate at `time`.
    pub fn interpolate(&self, time: f32) -> f32 {
        let first = &self.keys[0];
        if time <= first.time {
            return first.value;
        }
        let last = &self.keys[self.keys.len() - 1];
        if time >= last.time {
            return last.value;
        }
        for pair in self.keys.windows(2) {
            if time < pair[1].time {
                return pair[0].eval(&pair[1], time);
            }
        }
        last.value
    }

    /// Evaluate four times at once.
    ///
    /// Every segment is evaluated for every lane and the result selected
    /// by mask, so the cost is linear in the key count with no branches
    /// on the lane values.
    pub fn interpolate_lanes(&self, time: f32x4) -> f32x4 {
        let first = &self.keys[0];
        let mut result = f32x4::splat(first.value);
        for pair in self.keys.windows(2) {
            let in_segment = time.cmp_ge(f32x4::splat(pair[0].time));
            result = in_segment.blend(pair[0].eval_lanes(&pair[1], time), result);
        }
        let last = &self.keys[self.keys.len() - 1];
        let past_end = time.cmp_ge(f32x4::splat(last.time));
        past_end.blend(f32x4::splat(last.value), result)
    }

    /// Smallest and largest value the curve takes.
    pub fn value_range(&self) -> (f32, f32) {
        self.range
    }

    /// Number of keys.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// The precomputed keys.
    pub fn keys(&self) -> &[SplineKey] {
        &self.keys
    }

    /// Times of the first and last key.
    pub fn time_range(&self) -> (f32, f32) {
        (self.keys[0].time, self.keys[self.keys.len() - 1].time)
    }

    fn compute_range(&self) -> (f32, f32) {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for key in &self.keys {
            lo = lo.min(key.value);
            hi = hi.max(key.value);
        }
        for pair in self.keys.windows(2) {
            let (k0, k1) = (&pair[0], &pair[1]);
            if k0.time_mult == 0.0 {
                continue;
            }
            for t in segment_extrema(k1.value - k0.value, k0.coeff0, k0.coeff1) {
                let v = k0.eval_normalized(k1, t);
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        (lo, hi)
    }
}

/// Roots in `(0, 1)` of the derivative of one normalized segment:
/// `-3d t^2 + 2(d - c0) t + (dv + c0)` with `d = c1 - c0`.
fn segment_extrema(dv: f32, c0: f32, c1: f32) -> impl Iterator<Item = f32> {
    let d = c1 - c0;
    let a = -3.0 * d;
    let b = 2.0 * (d - c0);
    let c = dv + c0;

    let mut roots = [f32::NAN; 2];
    if a == 0.0 {
        if b != 0.0 {
            roots[0] = -c / b;
        }
    } else {
        let disc = b * b - 4.0 * a * c;
        if disc >= 0.0 {
            // Cancellation-free form of the quadratic formula.
            let q = -0.5 * (b + disc.sqrt().copysign(b));
            if q != 0.0 {
                roots[0] = q / a;
                roots[1] = c / q;
            }
        }
    }
    roots.into_iter().filter(|t| *t > 0.0 && *t < 1.0)
}

impl Default for Spline {
    /// Constant `1.0`.
    fn default() -> Self {
        Self::flat(1.0)
    }
}

/// Three splines evaluated together as an RGB colour.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorSpline {
    channels: [Spline; 3],
}

impl ColorSpline {
    /// Combine per-channel curves.
    pub fn new(red: Spline, green: Spline, blue: Spline) -> Self {
        Self {
            channels: [red, green, blue],
        }
    }

    /// Rebuild each channel from its authored keys.
    pub fn rebuild_from(&mut self, red: &[SourceKey], green: &[SourceKey], blue: &[SourceKey]) {
        self.channels[0].rebuild_from(red);
        self.channels[1].rebuild_from(green);
        self.channels[2].rebuild_from(blue);
    }

    /// Per-channel curves.
    pub fn channels(&self) -> &[Spline; 3] {
        &self.channels
    }

    /// Evaluate all channels at `time`.
    pub fn interpolate(&self, time: f32) -> Vec3 {
        Vec3::new(
            self.channels[0].interpolate(time),
            self.channels[1].interpolate(time),
            self.channels[2].interpolate(time),
        )
    }

    /// Per-channel `(min, max)` as two colours.
    pub fn value_range(&self) -> (Vec3, Vec3) {
        let [r, g, b] = self.channels.each_ref().map(Spline::value_range);
        (Vec3::new(r.0, g.0, b.0), Vec3::new(r.1, g.1, b.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave() -> Spline {
        Spline::from_keys(&[
            SourceKey::with_tangents(0.0, 0.0, 0.0, 2.0),
            SourceKey::with_tangents(0.4, 1.0, 0.0, 0.0),
            SourceKey::with_tangents(1.0, -0.5, -1.0, 0.0),
        ])
    }

    #[test]
    fn default_is_flat_one() {
        let s = Spline::default();
        assert_eq!(s.interpolate(-3.0), 1.0);
        assert_eq!(s.interpolate(0.5), 1.0);
        assert_eq!(s.value_range(), (1.0, 1.0));
    }

    #[test]
    fn degenerate_key_sets_are_flat() {
        let mut s = Spline::linear(0.0, 1.0);
        s.rebuild_from(&[]);
        assert_eq!(s.interpolate(0.3), 1.0);
        s.rebuild_from(&[SourceKey::new(0.7, 4.0)]);
        for t in [-1.0, 0.0, 0.7, 2.0] {
            assert_eq!(s.interpolate(t), 4.0);
        }
        assert_eq!(s.value_range(), (4.0, 4.0));
    }

    #[test]
    fn linear_interpolates_straight() {
        let s = Spline::linear(2.0, 6.0);
        assert_eq!(s.interpolate(0.0), 2.0);
        assert_eq!(s.interpolate(0.25), 3.0);
        assert_eq!(s.interpolate(1.0), 6.0);
        assert_eq!(s.interpolate(5.0), 6.0);
        assert_eq!(s.value_range(), (2.0, 6.0));
    }

    #[test]
    fn keys_round_trip() {
        let source = [
            SourceKey::with_tangents(0.0, 0.0, 0.0, 2.0),
            SourceKey::with_tangents(0.4, 1.0, 0.0, 0.0),
            SourceKey::with_tangents(1.0, -0.5, -1.0, 0.0),
        ];
        let s = Spline::from_keys(&source);
        assert_eq!(s.interpolate(0.0), 0.0);
        assert_eq!(s.interpolate(1.0), -0.5);
        assert!((s.interpolate(0.4) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let s = Spline::from_keys(&[SourceKey::new(1.0, 3.0), SourceKey::new(0.0, 1.0)]);
        assert_eq!(s.time_range(), (0.0, 1.0));
        assert_eq!(s.interpolate(0.0), 1.0);
        assert_eq!(s.interpolate(1.0), 3.0);
    }

    #[test]
    fn continuous_across_segment_boundaries() {
        let s = wave();
        let eps = 1e-4;
        let before = s.interpolate(0.4 - eps);
        let after = s.interpolate(0.4 + eps);
        assert!((before - after).abs() < 1e-2);
    }

    #[test]
    fn range_covers_overshoot() {
        let s = wave();
        let (lo, hi) = s.value_range();
        let mut sampled_lo = f32::INFINITY;
        let mut sampled_hi = f32::NEG_INFINITY;
        for i in 0..=1000 {
            let v = s.interpolate(i as f32 / 1000.0);
            sampled_lo = sampled_lo.min(v);
            sampled_hi = sampled_hi.max(v);
        }
        assert!(lo <= sampled_lo + 1e-5 && hi >= sampled_hi - 1e-5);
        assert!(sampled_lo - lo < 1e-3 && hi - sampled_hi < 1e-3);
    }

    #[test]
    fn flat_tangents_with_overshooting_slope_widen_range() {
        // Steep outgoing slope overshoots above the end value.
        let s = Spline::from_keys(&[
            SourceKey::with_tangents(0.0, 0.0, 0.0, 6.0),
            SourceKey::with_tangents(1.0, 1.0, 0.0, 0.0),
        ]);
        assert!(s.value_range().1 > 1.0);
    }

    #[test]
    fn coincident_times_do_not_divide_by_zero() {
        let s = Spline::from_keys(&[
            SourceKey::new(0.0, 0.0),
            SourceKey::new(0.5, 1.0),
            SourceKey::new(0.5, 2.0),
            SourceKey::new(1.0, 3.0),
        ]);
        assert!(s.interpolate(0.5).is_finite());
        assert_eq!(s.keys()[1].time_mult, 0.0);
        assert!((s.interpolate(0.75) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn lanes_agree_with_scalar() {
        let s = wave();
        let times = [-0.5, 0.1, 0.55, 1.5];
        let lanes = s.interpolate_lanes(f32x4::new(times)).to_array();
        for (t, lane) in times.iter().zip(lanes) {
            assert!((s.interpolate(*t) - lane).abs() < 1e-6, "t={t}");
        }
    }

    #[test]
    fn color_spline_evaluates_channels() {
        let c = ColorSpline::new(Spline::linear(0.0, 1.0), Spline::flat(0.5), Spline::linear(1.0, 0.0));
        assert_eq!(c.interpolate(0.5), Vec3::new(0.5, 0.5, 0.5));
        let (lo, hi) = c.value_range();
        assert_eq!(lo, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(hi, Vec3::new(1.0, 0.5, 1.0));
        assert_eq!(ColorSpline::default().interpolate(0.3), Vec3::ONE);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_keys() -> impl Strategy<Value = Vec<SourceKey>> {
            prop::collection::vec(
                (0.0f32..10.0, -5.0f32..5.0, -3.0f32..3.0, -3.0f32..3.0)
                    .prop_map(|(t, v, i, o)| SourceKey::with_tangents(t, v, i, o)),
                2..8,
            )
        }

        /// Keys with strictly increasing times at least a quarter apart.
        fn arb_spaced_keys() -> impl Strategy<Value = Vec<SourceKey>> {
            (
                0.0f32..2.0,
                prop::collection::vec(
                    (0.25f32..2.0, -5.0f32..5.0, -3.0f32..3.0, -3.0f32..3.0),
                    3..8,
                ),
            )
                .prop_map(|(start, steps)| {
                    let mut time = start;
                    steps
                        .into_iter()
                        .map(|(gap, v, i, o)| {
                            let key = SourceKey::with_tangents(time, v, i, o);
                            time += gap;
                            key
                        })
                        .collect()
                })
        }

        /// Upper bound on `|d value / d time|` over the segment starting
        /// at key `j`.
        fn segment_slope_bound(s: &Spline, j: usize) -> f32 {
            let (k0, k1) = (s.keys()[j], s.keys()[j + 1]);
            let shape = (k0.coeff1 - k0.coeff0).abs() / 4.0 + k0.coeff0.abs().max(k0.coeff1.abs());
            ((k1.value - k0.value).abs() + shape) * k0.time_mult
        }

        proptest! {
            #[test]
            fn interpolate_hits_endpoints(keys in arb_keys()) {
                let s = Spline::from_keys(&keys);
                let (t0, t1) = s.time_range();
                prop_assert_eq!(s.interpolate(t0), s.keys()[0].value);
                prop_assert_eq!(s.interpolate(t1), s.keys()[s.key_count() - 1].value);
            }

            #[test]
            fn interior_keys_round_trip_and_join(keys in arb_spaced_keys()) {
                let s = Spline::from_keys(&keys);
                prop_assert_eq!(s.key_count(), keys.len());
                for i in 1..s.key_count() - 1 {
                    let key = s.keys()[i];
                    prop_assert!((s.interpolate(key.time) - key.value).abs() <= 1e-6);

                    let slope = segment_slope_bound(&s, i - 1).max(segment_slope_bound(&s, i));
                    for eps in [1e-2f32, 1e-3] {
                        let tol = slope * eps * 1.01 + 1e-3 * (1.0 + key.value.abs());
                        let before = s.interpolate(key.time - eps);
                        let after = s.interpolate(key.time + eps);
                        prop_assert!((before - key.value).abs() <= tol, "key {} left {} vs {}", i, before, key.value);
                        prop_assert!((after - key.value).abs() <= tol, "key {} right {} vs {}", i, after, key.value);
                    }
                }
            }

            #[test]
            fn samples_stay_within_range(keys in arb_keys(), t in 0.0f32..10.0) {
                let s = Spline::from_keys(&keys);
                let (lo, hi) = s.value_range();
                let v = s.interpolate(t);
                let tol = 1e-3 * (1.0 + lo.abs().max(hi.abs()));
                prop_assert!(v >= lo - tol && v <= hi + tol, "{} not in {}..{}", v, lo, hi);
            }

            #[test]
            fn lanes_match_scalar(keys in arb_keys(), ts in prop::array::uniform4(-1.0f32..11.0)) {
                let s = Spline::from_keys(&keys);
                let lanes = s.interpolate_lanes(f32x4::new(ts)).to_array();
                for (t, lane) in ts.iter().zip(lanes) {
                    let scalar = s.interpolate(*t);
                    prop_assert!((scalar - lane).abs() <= 1e-4 * (1.0 + scalar.abs()));
                }
            }
        }
    }
}
