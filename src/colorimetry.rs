//! Chromaticity conversions, the CIE LAB forward transform, and CAT02
//! white-point adaptation.

use crate::data::{CAT02, CAT02_INV};
use crate::math::SquareMatrix;
use crate::Float;

/// CIE L*a*b* linearity threshold, 216/24389.
pub(crate) const LAB_EPSILON: Float = 0.008856451679;
/// CIE L*a*b* linear-segment slope, (24389/27)/116.
pub(crate) const LAB_KAPPA: Float = 7.787037037037;

pub fn xy_to_xyz(xy: [Float; 2]) -> [Float; 3] {
    [xy[0], xy[1], 1.0 - xy[0] - xy[1]]
}

pub fn uv_to_xy(uv: [Float; 2]) -> [Float; 2] {
    let scale = 2.0 * uv[0] - 8.0 * uv[1] + 4.0;
    [3.0 * uv[0] / scale, 2.0 * uv[1] / scale]
}

pub fn uv_to_xyz(uv: [Float; 2]) -> [Float; 3] {
    xy_to_xyz(uv_to_xy(uv))
}

/// CIE 1960 uv chromaticity of an XYZ triple.
pub fn xyz_to_uv(xyz: [Float; 3]) -> [Float; 2] {
    let scale = xyz[0] + 15.0 * xyz[1] + 3.0 * xyz[2];
    [4.0 * xyz[0] / scale, 6.0 * xyz[1] / scale]
}

pub(crate) fn lab_f(t: Float) -> Float {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        LAB_KAPPA * t + 16.0 / 116.0
    }
}

pub(crate) fn lab_f_derivative(t: Float) -> Float {
    if t > LAB_EPSILON {
        1.0 / (3.0 * t.cbrt().powi(2))
    } else {
        LAB_KAPPA
    }
}

/// CIE L*a*b* of the given XYZ rows, relative to `white`.
pub fn xyz_to_lab(rows: &[[Float; 3]], white: [Float; 3]) -> Vec<[Float; 3]> {
    rows.iter()
        .map(|xyz| {
            let f = [
                lab_f(xyz[0] / white[0]),
                lab_f(xyz[1] / white[1]),
                lab_f(xyz[2] / white[2]),
            ];
            [
                116.0 * f[1] - 16.0,
                500.0 * (f[0] - f[1]),
                200.0 * (f[1] - f[2]),
            ]
        })
        .collect()
}

/// CAT02 chromatic adaptation matrix taking `src_white_xyz` to
/// `dst_white_xyz`: `CAT02⁻¹ · diag(dst LMS / src LMS) · CAT02`.
pub fn calculate_cat(src_white_xyz: [Float; 3], dst_white_xyz: [Float; 3]) -> SquareMatrix<3> {
    let src_lms = CAT02.mul_vec(src_white_xyz);
    let dst_lms = CAT02.mul_vec(dst_white_xyz);

    let gain = SquareMatrix::diagonal([
        dst_lms[0] / src_lms[0],
        dst_lms[1] / src_lms[1],
        dst_lms[2] / src_lms[2],
    ]);

    CAT02_INV * gain * CAT02
}

#[cfg(test)]
mod test {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use crate::data::D65_WHITE_XYZ;

    use super::*;

    #[test]
    fn cat_maps_source_white_to_destination_white() {
        let d65 = [0.95047, 1.0, 1.08883];
        let d60 = [0.952646, 1.0, 1.008825];

        let cat = calculate_cat(d65, d60);
        let mapped = cat.mul_vec(d65);

        for i in 0..3 {
            assert_abs_diff_eq!(mapped[i], d60[i], epsilon = 1e-9);
        }
        assert_relative_eq!(cat[0][0], 1.0119, max_relative = 1e-4);
        assert_relative_eq!(cat[1][1], 1.0014, max_relative = 1e-4);
        assert_relative_eq!(cat[2][2], 0.9278, max_relative = 1e-4);
    }

    #[test]
    fn cat_to_same_white_is_identity() {
        let cat = calculate_cat(D65_WHITE_XYZ, D65_WHITE_XYZ);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(cat[i][j], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn lab_of_the_reference_white() {
        let lab = xyz_to_lab(&[[0.9547, 1.0, 1.0883]], [0.9547, 1.0, 1.0883]);
        assert_abs_diff_eq!(lab[0][0], 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(lab[0][1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(lab[0][2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn lab_linear_segment_below_threshold() {
        let t = LAB_EPSILON / 2.0;
        assert_relative_eq!(lab_f(t), LAB_KAPPA * t + 16.0 / 116.0);
        assert_relative_eq!(lab_f_derivative(t), LAB_KAPPA);
    }

    #[test]
    fn uv_roundtrip_through_xy() {
        let xyz = [0.9731171910, 1.0174927152, 0.9498565880];
        let uv = xyz_to_uv(xyz);
        let xyz2 = uv_to_xyz(uv);
        let xy2 = [
            xyz2[0] / (xyz2[0] + xyz2[1] + xyz2[2]),
            xyz2[1] / (xyz2[0] + xyz2[1] + xyz2[2]),
        ];
        let sum = xyz[0] + xyz[1] + xyz[2];
        assert_abs_diff_eq!(xy2[0], xyz[0] / sum, epsilon = 1e-12);
        assert_abs_diff_eq!(xy2[1], xyz[1] / sum, epsilon = 1e-12);
    }
}
