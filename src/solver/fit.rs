//! Nonlinear fit of the six free IDT parameters, minimising CIE LAB
//! residuals over the training patches.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use nalgebra::{storage::Owned, Const, DVector, Dyn, OMatrix, Vector6, U6};
use tracing::debug;

use crate::colorimetry::{lab_f_derivative, xyz_to_lab};
use crate::data::{ACES_RGB_TO_XYZ, ACES_WHITE_POINT_XYZ};
use crate::error::{Error, Result};
use crate::math::SquareMatrix;
use crate::Float;

const TOLERANCE: Float = 1e-17;
const MAX_ITERATIONS: usize = 300;

/// Assemble the unity-preserving 3x3 from the six free parameters: each row
/// ends with `1 - bi - bj`, so row sums are 1 by construction.
fn matrix_from_params(b: &Vector6<Float>) -> SquareMatrix<3> {
    SquareMatrix::new([
        [b[0], b[1], 1.0 - b[0] - b[1]],
        [b[2], b[3], 1.0 - b[2] - b[3]],
        [b[4], b[5], 1.0 - b[4] - b[5]],
    ])
}

struct IdtFit {
    rgb: Vec<[Float; 3]>,
    target_lab: Vec<[Float; 3]>,
    params: Vector6<Float>,
}

impl IdtFit {
    fn predicted_xyz(&self, matrix: &SquareMatrix<3>) -> Vec<[Float; 3]> {
        self.rgb
            .iter()
            .map(|&rgb| ACES_RGB_TO_XYZ.mul_vec(matrix.mul_vec(rgb)))
            .collect()
    }
}

impl LeastSquaresProblem<Float, Dyn, U6> for IdtFit {
    type ResidualStorage = Owned<Float, Dyn>;
    type JacobianStorage = Owned<Float, Dyn, U6>;
    type ParameterStorage = Owned<Float, U6>;

    fn set_params(&mut self, params: &Vector6<Float>) {
        self.params.copy_from(params);
    }

    fn params(&self) -> Vector6<Float> {
        self.params
    }

    fn residuals(&self) -> Option<DVector<Float>> {
        let matrix = matrix_from_params(&self.params);
        let lab = xyz_to_lab(&self.predicted_xyz(&matrix), ACES_WHITE_POINT_XYZ);

        let mut residuals = DVector::zeros(3 * self.rgb.len());
        for (i, (target, predicted)) in self.target_lab.iter().zip(&lab).enumerate() {
            for c in 0..3 {
                residuals[3 * i + c] = target[c] - predicted[c];
            }
        }

        Some(residuals)
    }

    fn jacobian(&self) -> Option<OMatrix<Float, Dyn, U6>> {
        let matrix = matrix_from_params(&self.params);
        let m = &ACES_RGB_TO_XYZ;
        let white = ACES_WHITE_POINT_XYZ;

        let mut jacobian = OMatrix::<Float, Dyn, U6>::zeros_generic(Dyn(3 * self.rgb.len()), Const::<6>);

        for (i, (&rgb, xyz)) in self
            .rgb
            .iter()
            .zip(self.predicted_xyz(&matrix))
            .enumerate()
        {
            // Chain rule through t = XYZ / white and the LAB nonlinearity.
            let fp = [
                lab_f_derivative(xyz[0] / white[0]) / white[0],
                lab_f_derivative(xyz[1] / white[1]) / white[1],
                lab_f_derivative(xyz[2] / white[2]) / white[2],
            ];

            for k in 0..6 {
                // Parameter k perturbs row k/2 of the fitted matrix; the
                // unity-preserving last column couples in -rgb.b.
                let row = k / 2;
                let factor = if k % 2 == 0 {
                    rgb[0] - rgb[2]
                } else {
                    rgb[1] - rgb[2]
                };

                let df = [
                    fp[0] * m[0][row] * factor,
                    fp[1] * m[1][row] * factor,
                    fp[2] * m[2][row] * factor,
                ];

                // Residuals are target - predicted.
                jacobian[(3 * i, k)] = -(116.0 * df[1]);
                jacobian[(3 * i + 1, k)] = -(500.0 * (df[0] - df[1]));
                jacobian[(3 * i + 2, k)] = -(200.0 * (df[1] - df[2]));
            }
        }

        Some(jacobian)
    }
}

/// Fit the IDT matrix mapping white-balanced camera RGB onto the target XYZ
/// rows, measured in LAB. Seeded at identity.
pub(crate) fn solve_idt(rgb: &[[Float; 3]], xyz: &[[Float; 3]]) -> Result<SquareMatrix<3>> {
    let problem = IdtFit {
        rgb: rgb.to_vec(),
        target_lab: xyz_to_lab(xyz, ACES_WHITE_POINT_XYZ),
        params: Vector6::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0),
    };

    let (solved, report) = LevenbergMarquardt::new()
        .with_ftol(TOLERANCE)
        .with_xtol(TOLERANCE)
        .with_gtol(TOLERANCE)
        .with_patience(MAX_ITERATIONS)
        .minimize(problem);

    // The tolerances are far below machine epsilon, so the driver usually
    // stops on exhausted patience or a vanishing step rather than formal
    // convergence. Both mean it took successful steps; only numerical
    // breakdown or missing data count as a failed solve.
    let stepped = report.termination.was_successful()
        || matches!(
            report.termination,
            TerminationReason::LostPatience | TerminationReason::NoImprovementPossible(_)
        );
    if !stepped {
        return Err(Error::SolveFailed);
    }

    debug!(
        evaluations = report.number_of_evaluations,
        objective = report.objective_function,
        "IDT fit converged"
    );

    Ok(matrix_from_params(&solved.params()))
}
