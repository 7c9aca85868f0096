//! Synthesis of illuminant spectral power distributions: CIE daylight from
//! the S-series components and Planckian blackbody radiators.

use crate::data::S_SERIES;
use crate::error::{Error, Result};
use crate::math::resample_linear;
use crate::spectral::{SpectralData, SpectralShape, Spectrum, MAIN_GROUP};
use crate::Float;

// Planck's constant (J*s)
const PLANCK: Float = 6.626176e-34;
// Boltzmann constant (J/K)
const BOLTZMANN: Float = 1.380662e-23;
// Speed of light (m/s)
const LIGHT_SPEED: Float = 2.99792458e8;
// Truncated pi; required for bit-identical radiance values.
const PI: Float = 3.1416;

/// Daylight-locus chromaticity for a correlated color temperature in Kelvin.
pub fn cct_to_xy(cctd: Float) -> [Float; 2] {
    let x = if (4002.15..=7003.77).contains(&cctd) {
        0.244063 + 99.11 / cctd + 2.9678e6 / cctd.powi(2) - 4.6070e9 / cctd.powi(3)
    } else {
        0.237040 + 247.48 / cctd + 1.9018e6 / cctd.powi(2) - 2.0064e9 / cctd.powi(3)
    };
    let y = -3.0 * x.powi(2) + 2.87 * x - 0.275;

    [x, y]
}

/// CIE daylight spectral power distribution for the given color temperature.
///
/// `cct` is either absolute Kelvin in `[4000, 25000]` or the short form in
/// `[40, 250]` (`55` meaning D55). The S-series components are resampled onto
/// the shape's step and the result is clipped to the visible 380-780 nm.
pub fn calculate_daylight_spd(cct: i32, shape: SpectralShape) -> Result<Spectrum> {
    let cctd = if (40..=250).contains(&cct) {
        cct as Float * 100.0 * 1.4387752 / 1.438
    } else if (4000..=25000).contains(&cct) {
        cct as Float
    } else {
        return Err(Error::DomainRange(format!(
            "daylight color temperature must lie in [4000, 25000] K, got {cct}"
        )));
    };

    if shape.step < 1 {
        return Err(Error::DataShape(format!(
            "invalid sampling step of {} nm",
            shape.step
        )));
    }

    let xy = cct_to_xy(cctd);
    let m0 = 0.0241 + 0.2562 * xy[0] - 0.7341 * xy[1];
    let m1 = (-1.3515 - 1.7703 * xy[0] + 5.9114 * xy[1]) / m0;
    let m2 = (0.03000 - 31.4424 * xy[0] + 30.0717 * xy[1]) / m0;

    let wavelengths: Vec<Float> = S_SERIES.iter().map(|row| row[0]).collect();
    let s0: Vec<Float> = S_SERIES.iter().map(|row| row[1]).collect();
    let s1: Vec<Float> = S_SERIES.iter().map(|row| row[2]).collect();
    let s2: Vec<Float> = S_SERIES.iter().map(|row| row[3]).collect();

    let table_start = wavelengths[0] as i32;
    let table_end = wavelengths[wavelengths.len() - 1] as i32;
    let grid: Vec<i32> = (table_start..=table_end)
        .step_by(shape.step as usize)
        .filter(|wl| (380..=780).contains(wl))
        .collect();
    if grid.is_empty() {
        return Err(Error::DataShape(format!(
            "a {} nm step leaves no samples in the visible range",
            shape.step
        )));
    }
    let targets = grid.iter().map(|&wl| wl as Float);

    let s0 = resample_linear(&wavelengths, &s0, targets.clone());
    let s1 = resample_linear(&wavelengths, &s1, targets.clone());
    let s2 = resample_linear(&wavelengths, &s2, targets);

    let values = (0..grid.len())
        .map(|i| s0[i] + m1 * s1[i] + m2 * s2[i])
        .collect();

    Spectrum::new(
        SpectralShape {
            start: grid[0],
            end: grid[grid.len() - 1],
            step: shape.step,
        },
        values,
    )
}

/// Planckian radiator spectral power distribution over 380-780 nm at 5 nm,
/// for color temperatures in `[1500, 4000)` Kelvin.
pub fn calculate_blackbody_spd(cct: i32) -> Result<Spectrum> {
    if !(1500..4000).contains(&cct) {
        return Err(Error::DomainRange(format!(
            "blackbody color temperature must lie in [1500, 4000) K, got {cct}"
        )));
    }

    let shape = SpectralShape::VISIBLE;
    let values = shape
        .wavelengths()
        .map(|wl| {
            let lambda = wl as Float / 1e9;
            let c1 = 2.0 * PLANCK * LIGHT_SPEED.powi(2);
            let c2 = (PLANCK * LIGHT_SPEED) / (BOLTZMANN * lambda * cct as Float);
            c1 * PI / (lambda.powi(5) * (c2.exp() - 1.0))
        })
        .collect();

    Spectrum::new(shape, values)
}

/// Wrap a synthesized SPD into a single-channel `power` bundle tagged with
/// the illuminant name.
pub fn generate_illuminant(cct: i32, tag: &str, daylight: bool) -> Result<SpectralData> {
    let spectrum = if daylight {
        calculate_daylight_spd(cct, SpectralShape::VISIBLE)?
    } else {
        calculate_blackbody_spd(cct)?
    };

    let mut data = SpectralData::default();
    data.illuminant = tag.to_string();
    data.insert_channel(MAIN_GROUP, "power", spectrum)?;
    Ok(data)
}

/// How a textual illuminant tag is fulfilled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum IlluminantKind {
    /// `d` followed by digits: CIE daylight, short form or absolute Kelvin.
    Daylight(i32),
    /// Digits followed by `k`: blackbody Kelvin.
    Blackbody(i32),
    /// Anything else names an illuminant in the database.
    Named(String),
}

pub(crate) fn classify_tag(tag: &str) -> IlluminantKind {
    let lower = tag.to_ascii_lowercase();

    if let Some(digits) = lower.strip_prefix('d') {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return IlluminantKind::Daylight(digits.parse().unwrap());
        }
    }
    if let Some(digits) = lower.strip_suffix('k') {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return IlluminantKind::Blackbody(digits.parse().unwrap());
        }
    }

    IlluminantKind::Named(lower)
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn daylight_accepts_both_domain_ends() {
        for cct in [4000, 25000, 40, 250] {
            assert!(calculate_daylight_spd(cct, SpectralShape::VISIBLE).is_ok());
        }
        for cct in [3999, 25001, 39, 251] {
            assert!(matches!(
                calculate_daylight_spd(cct, SpectralShape::VISIBLE),
                Err(Error::DomainRange(_))
            ));
        }
    }

    #[test]
    fn daylight_covers_the_visible_grid() {
        let spd = calculate_daylight_spd(55, SpectralShape::VISIBLE).unwrap();
        assert_eq!(spd.shape(), SpectralShape::VISIBLE);
        assert_eq!(spd.values().len(), 81);
        assert!(spd.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn daylight_locus_matches_d65() {
        // D65 sits at roughly 6504 K on the daylight locus.
        let xy = cct_to_xy(6500.0 * 1.4387752 / 1.438);
        assert_abs_diff_eq!(xy[0], 0.3127, epsilon = 1e-3);
        assert_abs_diff_eq!(xy[1], 0.3290, epsilon = 1e-3);
    }

    #[test]
    fn blackbody_interval_is_closed_open() {
        assert!(calculate_blackbody_spd(1500).is_ok());
        assert!(matches!(
            calculate_blackbody_spd(4000),
            Err(Error::DomainRange(_))
        ));
        assert!(matches!(
            calculate_blackbody_spd(1499),
            Err(Error::DomainRange(_))
        ));
    }

    #[test]
    fn blackbody_rises_toward_the_red_end() {
        // Below 4000 K the Planck curve peaks in the infrared, so the
        // visible-range samples increase monotonically.
        let spd = calculate_blackbody_spd(2856).unwrap();
        let values = spd.values();
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn tags_classify_by_prefix_and_suffix() {
        assert_eq!(classify_tag("D55"), IlluminantKind::Daylight(55));
        assert_eq!(classify_tag("d5500"), IlluminantKind::Daylight(5500));
        assert_eq!(classify_tag("3200K"), IlluminantKind::Blackbody(3200));
        assert_eq!(
            classify_tag("fluorescent"),
            IlluminantKind::Named("fluorescent".into())
        );
        // 'd' followed by non-digits is a database name, not daylight.
        assert_eq!(
            classify_tag("daylight"),
            IlluminantKind::Named("daylight".into())
        );
    }

    #[test]
    fn generated_illuminant_carries_the_power_channel() {
        let illuminant = generate_illuminant(5500, "d55", true).unwrap();
        assert_eq!(illuminant.illuminant, "d55");
        assert_eq!(illuminant.channel_count(), 1);
        assert!(illuminant.channel("power").is_ok());
    }
}
