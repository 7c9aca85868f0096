use crate::Float;

#[inline]
pub fn lerp(a: Float, b: Float, t: Float) -> Float {
    (1.0 - t) * a + t * b
}

/// Scalar 2D cross product: positive when `b` is counterclockwise from `a`.
#[inline]
pub fn cross_2(a: [Float; 2], b: [Float; 2]) -> Float {
    a[0] * b[1] - a[1] * b[0]
}

/// Piecewise-linear resampling of the curve `(x0, y0)` at the points `x1`.
/// Points outside the table extrapolate the nearest segment's line.
pub fn resample_linear(
    x0: &[Float],
    y0: &[Float],
    x1: impl IntoIterator<Item = Float>,
) -> Vec<Float> {
    assert_eq!(x0.len(), y0.len());
    assert!(x0.len() >= 2);

    let last_segment = x0.len() - 2;
    x1.into_iter()
        .map(|x| {
            // Knots at or below x pick the segment; clamping to the table
            // extends the end segments outward.
            let below = x0.partition_point(|&knot| knot <= x);
            let segment = below.saturating_sub(1).min(last_segment);

            let t = (x - x0[segment]) / (x0[segment + 1] - x0[segment]);
            lerp(y0[segment], y0[segment + 1], t)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn resample_interpolates_and_extrapolates() {
        let x0 = [0.0, 10.0, 20.0];
        let y0 = [0.0, 10.0, 30.0];

        let y1 = resample_linear(&x0, &y0, [5.0, 15.0, 25.0, -5.0]);
        assert_relative_eq!(y1[0], 5.0);
        assert_relative_eq!(y1[1], 20.0);
        // Beyond the last point, the last segment's slope continues.
        assert_relative_eq!(y1[2], 40.0);
        // Before the first point, the first segment's slope continues.
        assert_relative_eq!(y1[3], -5.0);
    }

    #[test]
    fn resample_hits_the_knots_exactly() {
        let x0 = [300.0, 310.0, 320.0];
        let y0 = [1.0, 4.0, 9.0];

        let y1 = resample_linear(&x0, &y0, [300.0, 310.0, 320.0]);
        assert_relative_eq!(y1[0], 1.0);
        assert_relative_eq!(y1[1], 4.0);
        assert_relative_eq!(y1[2], 9.0);
    }

    #[test]
    fn cross_2_sign() {
        assert_relative_eq!(cross_2([1.0, 0.0], [0.0, 1.0]), 1.0);
        assert_relative_eq!(cross_2([0.0, 1.0], [1.0, 0.0]), -1.0);
    }
}
