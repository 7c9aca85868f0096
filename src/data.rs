//! Embedded color-science tables consumed by the solvers.

use crate::math::SquareMatrix;
use crate::Float;

/// ACES adopted white (equivalent to CIE D60), in XYZ.
pub const ACES_WHITE_POINT_XYZ: [Float; 3] = [0.952646074569846, 1.0, 1.00882518435159];

pub const D50_WHITE_XYZ: [Float; 3] = [0.9642, 1.0, 0.8250];
pub const D60_WHITE_XYZ: [Float; 3] = [0.952646074569846, 1.0, 1.00882518435159];
pub const D65_WHITE_XYZ: [Float; 3] = [0.9547, 1.0, 1.0883];

/// ACES AP0 primaries and white, as (x, y) chromaticities (R, G, B, W).
pub const ACES_CHROMATICITIES: [[Float; 2]; 4] = [
    [0.73470, 0.26530],
    [0.00000, 1.00000],
    [0.00010, -0.07700],
    [0.32168, 0.33767],
];

/// CAT02 cone response matrix from the CIECAM02 appearance model.
pub const CAT02: SquareMatrix<3> = SquareMatrix::new([
    [0.7328, 0.4296, -0.1624],
    [-0.7036, 1.6975, 0.0061],
    [0.0030, 0.0136, 0.9834],
]);

pub const CAT02_INV: SquareMatrix<3> = SquareMatrix::new([
    [1.0961238208355142, -0.27886900021828726, 0.18274517938277304],
    [0.45436904197535921, 0.47353315430741177, 0.072097803717229125],
    [-0.0096276087384293551, -0.0056980312161134198, 1.0153256399545427],
]);

/// D65-relative XYZ to ACES AP0 RGB.
pub const XYZ_D65_TO_ACES_RGB: SquareMatrix<3> = SquareMatrix::new([
    [1.0634731317028, 0.00639793641966071, -0.0157891874506841],
    [-0.492082784686793, 1.36823709310019, 0.0913444629573544],
    [-0.0028137154424595, 0.00463991165243123, 0.91649468506889],
]);

/// ACES-relative XYZ to ACES AP0 RGB.
pub const XYZ_TO_ACES_RGB: SquareMatrix<3> = SquareMatrix::new([
    [1.0498110175, 0.0000000000, -0.0000974845],
    [-0.4959030231, 1.3733130458, 0.0982400361],
    [0.0000000000, 0.0000000000, 0.9912520182],
]);

/// ACES AP0 RGB to ACES-relative XYZ.
pub const ACES_RGB_TO_XYZ: SquareMatrix<3> = SquareMatrix::new([
    [0.952552395938186, 0.0, 9.36786316604686e-05],
    [0.343966449765075, 0.728166096613485, -0.0721325463785608],
    [0.0, 0.0, 1.00882518435159],
]);

/// CIE S-series daylight components, sampled every 10 nm over 300-830 nm.
/// Each row is `[wavelength, S0, S1, S2]`.
pub const S_SERIES: [[Float; 4]; 54] = [
    [300.0, 0.04, 0.02, 0.0],
    [310.0, 6.0, 4.5, 2.0],
    [320.0, 29.6, 22.4, 4.0],
    [330.0, 55.3, 42.0, 8.5],
    [340.0, 57.3, 40.6, 7.8],
    [350.0, 61.8, 41.6, 6.7],
    [360.0, 61.5, 38.0, 5.3],
    [370.0, 68.8, 42.4, 6.1],
    [380.0, 63.4, 38.5, 3.0],
    [390.0, 65.8, 35.0, 1.2],
    [400.0, 94.8, 43.4, -1.1],
    [410.0, 104.8, 46.3, -0.5],
    [420.0, 105.9, 43.9, -0.7],
    [430.0, 96.8, 37.1, -1.2],
    [440.0, 113.9, 36.7, -2.6],
    [450.0, 125.6, 35.9, -2.9],
    [460.0, 125.5, 32.6, -2.8],
    [470.0, 121.3, 27.9, -2.6],
    [480.0, 121.3, 24.3, -2.6],
    [490.0, 113.5, 20.1, -1.8],
    [500.0, 113.1, 16.2, -1.5],
    [510.0, 110.8, 13.2, -1.3],
    [520.0, 106.5, 8.6, -1.2],
    [530.0, 108.8, 6.1, -1.0],
    [540.0, 105.3, 4.2, -0.5],
    [550.0, 104.4, 1.9, -0.3],
    [560.0, 100.0, 0.0, 0.0],
    [570.0, 96.0, -1.6, 0.2],
    [580.0, 95.1, -3.5, 0.5],
    [590.0, 89.1, -3.5, 2.1],
    [600.0, 90.5, -5.8, 3.2],
    [610.0, 90.3, -7.2, 4.1],
    [620.0, 88.4, -8.6, 4.7],
    [630.0, 84.0, -9.5, 5.1],
    [640.0, 85.1, -10.9, 6.7],
    [650.0, 81.9, -10.7, 7.3],
    [660.0, 82.6, -12.0, 8.6],
    [670.0, 84.9, -14.0, 9.8],
    [680.0, 81.3, -13.6, 10.2],
    [690.0, 71.9, -12.0, 8.3],
    [700.0, 74.3, -13.3, 9.6],
    [710.0, 76.4, -12.9, 8.5],
    [720.0, 63.3, -10.6, 7.0],
    [730.0, 71.7, -11.6, 7.6],
    [740.0, 77.0, -12.2, 8.0],
    [750.0, 65.2, -10.2, 6.7],
    [760.0, 47.7, -7.8, 5.2],
    [770.0, 68.6, -11.2, 7.4],
    [780.0, 65.0, -10.4, 6.8],
    [790.0, 66.0, -10.6, 7.0],
    [800.0, 61.0, -9.7, 6.4],
    [810.0, 53.3, -8.3, 5.5],
    [820.0, 58.9, -9.3, 6.1],
    [830.0, 61.9, -9.8, 6.5],
];

/// Robertson isotherms: `(u, v, isotherm slope)` per tabulated temperature.
pub const ROBERTSON_UVT: [[Float; 3]; 31] = [
    [0.18006, 0.26352, -0.24341],
    [0.18066, 0.26589, -0.25479],
    [0.18133, 0.26846, -0.26876],
    [0.18208, 0.27119, -0.28539],
    [0.18293, 0.27407, -0.3047],
    [0.18388, 0.27709, -0.32675],
    [0.18494, 0.28021, -0.35156],
    [0.18611, 0.28342, -0.37915],
    [0.18740, 0.28668, -0.40955],
    [0.18880, 0.28997, -0.44278],
    [0.19032, 0.29326, -0.47888],
    [0.19462, 0.30141, -0.58204],
    [0.19962, 0.30921, -0.70471],
    [0.20525, 0.31647, -0.84901],
    [0.21142, 0.32312, -1.0182],
    [0.21807, 0.32909, -1.2168],
    [0.22511, 0.33439, -1.4512],
    [0.23247, 0.33904, -1.7298],
    [0.24010, 0.34308, -2.0637],
    [0.24792, 0.34655, -2.4681],
    [0.25591, 0.34951, -2.9641],
    [0.26400, 0.35200, -3.5814],
    [0.27218, 0.35407, -4.3633],
    [0.28039, 0.35577, -5.3762],
    [0.28863, 0.35714, -6.7262],
    [0.29685, 0.35823, -8.5955],
    [0.30505, 0.35907, -11.324],
    [0.31320, 0.35968, -15.628],
    [0.32129, 0.36011, -23.325],
    [0.32931, 0.36038, -40.77],
    [0.33724, 0.36051, -116.45],
];

/// Mired values matching the rows of [`ROBERTSON_UVT`].
pub const ROBERTSON_MIRED: [Float; 31] = [
    1.0e-10, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0, 125.0, 150.0, 175.0,
    200.0, 225.0, 250.0, 275.0, 300.0, 325.0, 350.0, 375.0, 400.0, 425.0, 450.0, 475.0, 500.0,
    525.0, 550.0, 575.0, 600.0,
];

/// EXIF LightSource tag values with a defined correlated color temperature.
pub const EXIF_LIGHT_SOURCES: [(u16, Float); 11] = [
    (0, 5500.0),
    (1, 5500.0),
    (2, 3500.0),
    (3, 3400.0),
    (10, 5550.0),
    (17, 2856.0),
    (18, 4874.0),
    (19, 6774.0),
    (20, 5500.0),
    (21, 6500.0),
    (22, 7500.0),
];
