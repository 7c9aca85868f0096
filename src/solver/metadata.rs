//! The metadata solver: derives the IDT from DNG-style calibration tags by
//! temperature interpolation on the Robertson isotherms.

use tracing::warn;

use crate::colorimetry::{calculate_cat, uv_to_xyz, xy_to_xyz, xyz_to_uv};
use crate::data::{
    ACES_CHROMATICITIES, EXIF_LIGHT_SOURCES, ROBERTSON_MIRED, ROBERTSON_UVT, XYZ_D65_TO_ACES_RGB,
};
use crate::error::{Error, Result};
use crate::math::{cross_2, SquareMatrix};
use crate::Float;

const IDENTITY_FLAT: [Float; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// One DNG calibration set: an EXIF light-source tag and the XYZ-to-camera
/// matrix measured under it, both row-major.
#[derive(Clone, Debug)]
pub struct Calibration {
    /// EXIF LightSource tag; values >= 32768 encode Kelvin directly, 0 means
    /// no calibration illuminant was recorded.
    pub illuminant: u16,
    pub xyz_to_rgb_matrix: [Float; 9],
    /// Identity in current files, preserved for forward compatibility.
    pub camera_calibration_matrix: [Float; 9],
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            illuminant: 0,
            xyz_to_rgb_matrix: IDENTITY_FLAT,
            camera_calibration_matrix: IDENTITY_FLAT,
        }
    }
}

/// DNG-style calibration metadata of one capture.
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    /// Exposure compensation in stops.
    pub baseline_exposure: Float,
    /// As-shot neutral in camera-native RGB, when the file carries one.
    pub neutral_rgb: Option<[Float; 3]>,
    pub calibration: [Calibration; 2],
}

#[inline]
pub fn cct_to_mired(cct: Float) -> Float {
    1.0e6 / cct
}

#[inline]
pub fn mired_to_cct(mired: Float) -> Float {
    1.0e6 / mired
}

/// Signed distance from `uv` to the isotherm through the table row `uvt`.
pub fn robertson_length(uv: [Float; 2], uvt: [Float; 3]) -> Float {
    let t = uvt[2];
    let sign = if t < 0.0 {
        -1.0
    } else if t > 0.0 {
        1.0
    } else {
        0.0
    };

    let slope_x = -sign / (1.0 + t * t).sqrt();
    let slope = [slope_x, t * slope_x];

    cross_2(slope, [uv[0] - uvt[0], uv[1] - uvt[1]])
}

/// CCT of an EXIF LightSource tag. Unknown tags fall back to 5500 K.
pub fn light_source_to_color_temp(tag: u16) -> Float {
    if tag >= 32768 {
        return (tag - 32768) as Float;
    }

    EXIF_LIGHT_SOURCES
        .iter()
        .find(|(known, _)| *known == tag)
        .map(|(_, cct)| *cct)
        .unwrap_or(5500.0)
}

/// Correlated color temperature of an XYZ triple via the Robertson
/// isotherms, clamped to [2000, 50000] K.
pub fn xyz_to_color_temperature(xyz: [Float; 3]) -> Float {
    let uv = xyz_to_uv(xyz);

    let mut this_distance = 0.0;
    let mut previous_distance = 0.0;
    let mut index = ROBERTSON_UVT.len();

    for (i, row) in ROBERTSON_UVT.iter().enumerate() {
        this_distance = robertson_length(uv, *row);
        if this_distance <= 0.0 {
            index = i;
            break;
        }
        previous_distance = this_distance;
    }

    let mired = if index == 0 {
        ROBERTSON_MIRED[0]
    } else if index >= ROBERTSON_UVT.len() {
        ROBERTSON_MIRED[ROBERTSON_UVT.len() - 1]
    } else {
        // Interpolate between the bracketing isotherms, weighted by the two
        // successive signed distances.
        ROBERTSON_MIRED[index - 1]
            + previous_distance * (ROBERTSON_MIRED[index] - ROBERTSON_MIRED[index - 1])
                / (previous_distance - this_distance)
    };

    mired_to_cct(mired).clamp(2000.0, 50000.0)
}

/// XYZ of the blackbody-locus point at the given temperature, interpolating
/// the Robertson table in mired space.
pub fn color_temperature_to_xyz(cct: Float) -> [Float; 3] {
    let mired = cct_to_mired(cct);
    let count = ROBERTSON_MIRED.len();

    let index = ROBERTSON_MIRED
        .iter()
        .position(|&m| m >= mired)
        .unwrap_or(count);

    let uv = if index == 0 {
        [ROBERTSON_UVT[0][0], ROBERTSON_UVT[0][1]]
    } else if index >= count {
        [ROBERTSON_UVT[count - 1][0], ROBERTSON_UVT[count - 1][1]]
    } else {
        let weight =
            (mired - ROBERTSON_MIRED[index - 1]) / (ROBERTSON_MIRED[index] - ROBERTSON_MIRED[index - 1]);
        [
            weight * ROBERTSON_UVT[index][0] + (1.0 - weight) * ROBERTSON_UVT[index - 1][0],
            weight * ROBERTSON_UVT[index][1] + (1.0 - weight) * ROBERTSON_UVT[index - 1][1],
        ]
    };

    uv_to_xyz(uv)
}

/// Blend of the two calibration matrices, weighted in mired space:
/// `(1 - w) * matrix1 + w * matrix2` with `w` clamped to [0, 1].
pub fn xyz_to_camera_weighted_matrix(
    mired0: Float,
    mired1: Float,
    mired2: Float,
    matrix1: &SquareMatrix<3>,
    matrix2: &SquareMatrix<3>,
) -> SquareMatrix<3> {
    let weight = ((mired1 - mired0) / (mired1 - mired2)).clamp(0.0, 1.0);
    *matrix1 * (1.0 - weight) + *matrix2 * weight
}

/// The XYZ→camera matrix for the scene, found by sweeping mired space for a
/// temperature estimate consistent with the as-shot neutral.
///
/// Without calibration illuminants or a neutral reading the first
/// calibration matrix is returned unmodified.
pub fn find_xyz_to_camera_matrix(metadata: &Metadata) -> Result<SquareMatrix<3>> {
    let matrix1 = SquareMatrix::from(metadata.calibration[0].xyz_to_rgb_matrix);

    if metadata.calibration[0].illuminant == 0 {
        warn!("no calibration illuminants found; using the first calibration matrix");
        return Ok(matrix1);
    }
    let Some(neutral_rgb) = metadata.neutral_rgb else {
        warn!("no as-shot neutral values found; using the first calibration matrix");
        return Ok(matrix1);
    };

    let matrix2 = SquareMatrix::from(metadata.calibration[1].xyz_to_rgb_matrix);

    let mired1 = cct_to_mired(light_source_to_color_temp(metadata.calibration[0].illuminant));
    let mired2 = cct_to_mired(light_source_to_color_temp(metadata.calibration[1].illuminant));

    let max_mired = cct_to_mired(2000.0);
    let min_mired = cct_to_mired(50000.0);

    let low = min_mired.max(max_mired.min(mired1.min(mired2)));
    let high = min_mired.max(max_mired.min(mired1.max(mired2)));
    let step = ((high - low) / 50.0).max(5.0);

    let mut estimated = 0.0;
    let mut last_error = 0.0;
    let mut last_mired = 0.0;
    let mut smallest_error: Float = 0.0;

    let mut mired = low;
    while mired < high {
        let interpolated = xyz_to_camera_weighted_matrix(mired, mired1, mired2, &matrix1, &matrix2);
        let inverse = interpolated.inverse().ok_or_else(|| {
            Error::DataShape("the interpolated calibration matrix is singular".into())
        })?;

        let neutral_xyz = inverse.mul_vec(neutral_rgb);
        let error = mired - cct_to_mired(xyz_to_color_temperature(neutral_xyz));

        if error.abs() <= 1e-9 {
            estimated = mired;
            break;
        }
        if (mired - low).abs() > 1e-9 && error * last_error <= 0.0 {
            // The error changed sign: accept the linear root crossing.
            estimated = mired + error / (error - last_error) * (mired - last_mired);
            break;
        }
        if (mired - low).abs() <= 1e-9 || error.abs() < smallest_error.abs() {
            estimated = mired;
            smallest_error = error;
        }

        last_error = error;
        last_mired = mired;
        mired += step;
    }

    Ok(xyz_to_camera_weighted_matrix(
        estimated, mired1, mired2, &matrix1, &matrix2,
    ))
}

/// RGB→XYZ primary matrix from four (x, y) chromaticities (R, G, B, W).
pub fn matrix_rgb_to_xyz(chromaticities: &[[Float; 2]; 4]) -> Result<SquareMatrix<3>> {
    let r = xy_to_xyz(chromaticities[0]);
    let g = xy_to_xyz(chromaticities[1]);
    let b = xy_to_xyz(chromaticities[2]);
    let w = xy_to_xyz(chromaticities[3]);

    let primaries = SquareMatrix::new([
        [r[0], g[0], b[0]],
        [r[1], g[1], b[1]],
        [r[2], g[2], b[2]],
    ]);

    let white = [w[0] / w[1], 1.0, w[2] / w[1]];
    let gains = primaries
        .inverse()
        .ok_or_else(|| Error::DataShape("the primary matrix is singular".into()))?
        .mul_vec(white);

    Ok(primaries * SquareMatrix::diagonal(gains))
}

/// Camera→XYZ matrix, scaled by the baseline exposure, plus the camera's
/// white point in XYZ normalised to unit luminance.
pub fn camera_xyz_matrix_and_white_point(
    metadata: &Metadata,
) -> Result<(SquareMatrix<3>, [Float; 3])> {
    let xyz_to_camera = find_xyz_to_camera_matrix(metadata)?;
    let camera_to_xyz = xyz_to_camera
        .inverse()
        .ok_or_else(|| Error::DataShape("the XYZ to camera matrix is singular".into()))?;
    if camera_to_xyz.sum().abs() <= 1e-9 {
        return Err(Error::DataShape(
            "the camera to XYZ matrix sums to zero".into(),
        ));
    }

    let camera_to_xyz = camera_to_xyz * Float::powf(2.0, metadata.baseline_exposure);

    let white = match metadata.neutral_rgb {
        Some(neutral) => camera_to_xyz.mul_vec(neutral),
        None => color_temperature_to_xyz(light_source_to_color_temp(
            metadata.calibration[0].illuminant,
        )),
    };
    if white[1].abs() <= 1e-9 {
        return Err(Error::DataShape(
            "the camera white point has no luminance".into(),
        ));
    }
    let white = [white[0] / white[1], 1.0, white[2] / white[1]];

    Ok((camera_to_xyz, white))
}

/// Derives the IDT from DNG-style calibration metadata.
#[derive(Clone, Debug)]
pub struct MetadataSolver {
    metadata: Metadata,
}

impl MetadataSolver {
    pub fn new(metadata: Metadata) -> Self {
        Self { metadata }
    }

    /// Chromatic adaptation from the camera's white point to the ACES white.
    pub fn calculate_cat_matrix(&self) -> Result<SquareMatrix<3>> {
        let (_, camera_white) = camera_xyz_matrix_and_white_point(&self.metadata)?;

        let aces_rgb_to_xyz = matrix_rgb_to_xyz(&ACES_CHROMATICITIES)?;
        let aces_white = aces_rgb_to_xyz.mul_vec([1.0, 1.0, 1.0]);

        Ok(calculate_cat(camera_white, aces_white))
    }

    /// The IDT: D65-relative XYZ→ACES composed with the adaptation matrix.
    pub fn calculate_idt_matrix(&self) -> Result<SquareMatrix<3>> {
        let cat = self.calculate_cat_matrix()?;
        let idt = XYZ_D65_TO_ACES_RGB * cat;

        if idt.sum().abs() <= 1e-9 {
            return Err(Error::DataShape("the IDT matrix sums to zero".into()));
        }

        Ok(idt)
    }
}
