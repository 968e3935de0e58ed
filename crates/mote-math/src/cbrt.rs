//! Fast cube-root approximation for uniform ball sampling.

use wide::f32x4;

/// Approximates `x^(1/3)` on `[0, 1]` as a blend of `sqrt(x)` and `x^(1/4)`.
///
/// The blend weight is chosen so the curve passes exactly through the
/// anchor point; it is also exact at `0` and `1`. Between those points
/// the absolute error stays below a few percent, which is invisible when
/// the result only scales a random radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubeRootApprox {
    weight: f32,
}

impl CubeRootApprox {
    /// Calibrate around `anchor`, which must lie strictly inside `(0, 1)`.
    ///
    /// # Panics
    ///
    /// Panics if `anchor` is outside `(0, 1)`.
    #[track_caller]
    pub fn new(anchor: f32) -> Self {
        assert!(
            anchor > 0.0 && anchor < 1.0,
            "cube root anchor {anchor} must lie in (0, 1)"
        );
        let a = f64::from(anchor);
        let cube = a.cbrt();
        let square = a.sqrt();
        let fourth = square.sqrt();
        Self {
            weight: ((cube - fourth) / (square - fourth)) as f32,
        }
    }

    /// The sqrt share of the blend.
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Approximate cube root of `x` in `[0, 1]`.
    #[inline]
    pub fn eval(&self, x: f32) -> f32 {
        let square = x.sqrt();
        let fourth = square.sqrt();
        fourth + (square - fourth) * self.weight
    }

    /// Lane version of [`CubeRootApprox::eval`].
    #[inline]
    pub fn eval_lanes(&self, x: f32x4) -> f32x4 {
        let square = x.sqrt();
        let fourth = square.sqrt();
        fourth + (square - fourth) * f32x4::splat(self.weight)
    }
}

impl Default for CubeRootApprox {
    /// Anchored at `0.125`, whose cube root is exactly `0.5`.
    fn default() -> Self {
        Self::new(0.125)
    }
}
