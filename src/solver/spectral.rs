//! The spectral solver: derives white-balance multipliers and the IDT matrix
//! from measured camera sensitivities, an illuminant, a standard observer and
//! a reflectance training set.

use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::{debug, warn};

use crate::colorimetry::calculate_cat;
use crate::data::ACES_WHITE_POINT_XYZ;
use crate::error::{Error, Result};
use crate::illuminant::{classify_tag, generate_illuminant, IlluminantKind};
use crate::math::SquareMatrix;
use super::fit;
use crate::spectral::{SpectralData, Spectrum, MAIN_GROUP};
use crate::Float;

/// Scale the illuminant in place so that the camera channel with the largest
/// spectral peak integrates to unity against it.
pub fn scale_illuminant(camera: &SpectralData, illuminant: &mut SpectralData) -> Result<()> {
    let max_r = camera.channel("R")?.max_value()?;
    let max_g = camera.channel("G")?.max_value()?;
    let max_b = camera.channel("B")?.max_value()?;

    let peak_channel = if max_r >= max_g && max_r >= max_b {
        "R"
    } else if max_g >= max_r && max_g >= max_b {
        "G"
    } else {
        "B"
    };

    let response = camera
        .channel(peak_channel)?
        .product(illuminant.channel("power")?)?;
    let scale = 1.0 / response.integrate();
    illuminant.channel_mut("power")?.scale(scale);

    Ok(())
}

/// White-balance multipliers normalised to the green channel. Scales the
/// illuminant in place first; the multipliers themselves are ratios of
/// integrals and do not depend on that scale.
pub fn white_balance(camera: &SpectralData, illuminant: &mut SpectralData) -> Result<[Float; 3]> {
    scale_illuminant(camera, illuminant)?;

    let power = illuminant.channel("power")?;
    let r = camera.channel("R")?.product(power)?.integrate();
    let g = camera.channel("G")?.product(power)?.integrate();
    let b = camera.channel("B")?.product(power)?.integrate();

    Ok([g / r, 1.0, g / b])
}

/// Per-channel camera multipliers normalised by the largest integrated
/// response.
pub fn camera_multipliers(camera: &SpectralData, illuminant: &SpectralData) -> Result<[Float; 3]> {
    let power = illuminant.channel("power")?;
    let r = camera.channel("R")?.product(power)?.integrate();
    let g = camera.channel("G")?.product(power)?.integrate();
    let b = camera.channel("B")?.product(power)?.integrate();

    let max = r.max(g).max(b);
    Ok([max / r, max / g, max / b])
}

/// Spectral radiance of each training patch under the illuminant, in the
/// patch order of the training file.
pub fn training_radiances(
    illuminant: &SpectralData,
    training_data: &SpectralData,
) -> Result<Vec<Spectrum>> {
    let power = illuminant.channel("power")?;
    training_data
        .group(MAIN_GROUP)?
        .iter()
        .map(|(_, patch)| patch.product(power))
        .collect()
}

/// White-balanced linear camera response for each training radiance.
pub fn white_balanced_rgb(
    camera: &SpectralData,
    wb_multipliers: [Float; 3],
    radiances: &[Spectrum],
) -> Result<Vec<[Float; 3]>> {
    let r = camera.channel("R")?;
    let g = camera.channel("G")?;
    let b = camera.channel("B")?;

    radiances
        .iter()
        .map(|ti| {
            Ok([
                ti.product(r)?.integrate() * wb_multipliers[0],
                ti.product(g)?.integrate() * wb_multipliers[1],
                ti.product(b)?.integrate() * wb_multipliers[2],
            ])
        })
        .collect()
}

/// Tristimulus values of each training radiance, normalised to the
/// illuminant's luminance and chromatically adapted to the ACES white.
pub fn adapted_xyz(
    observer: &SpectralData,
    illuminant: &SpectralData,
    radiances: &[Spectrum],
) -> Result<Vec<[Float; 3]>> {
    let x = observer.channel("X")?;
    let y = observer.channel("Y")?;
    let z = observer.channel("Z")?;
    let power = illuminant.channel("power")?;

    let y_integral = y.product(power)?.integrate();
    let scale = 1.0 / y_integral;

    let mut xyz: Vec<[Float; 3]> = radiances
        .iter()
        .map(|ti| {
            Ok([
                ti.product(x)?.integrate() * scale,
                ti.product(y)?.integrate() * scale,
                ti.product(z)?.integrate() * scale,
            ])
        })
        .collect::<Result<_>>()?;

    // Adopted white of the illuminant, then adapt every row to ACES.
    let white = [
        x.product(power)?.integrate() / y_integral,
        1.0,
        z.product(power)?.integrate() / y_integral,
    ];
    let cat = calculate_cat(white, ACES_WHITE_POINT_XYZ);
    for row in xyz.iter_mut() {
        *row = cat.mul_vec(*row);
    }

    Ok(xyz)
}

/// Relative sum of squared errors between two sets of multipliers.
fn wb_sse(candidate: [Float; 3], target: [Float; 3]) -> Float {
    candidate
        .iter()
        .zip(target)
        .map(|(c, t)| (c / t - 1.0).powi(2))
        .sum()
}

fn configured<'a>(
    slot: &'a Option<SpectralData>,
    channels: usize,
    name: &'static str,
    operation: &'static str,
) -> Result<&'a SpectralData> {
    match slot {
        Some(data) if data.channel_count() == channels => Ok(data),
        _ => Err(Error::NotConfigured {
            slot: name,
            operation,
        }),
    }
}

/// Derives WB multipliers and the IDT matrix from spectral measurements.
///
/// The four input slots hold one `SpectralData` each: camera (`R`/`G`/`B`),
/// illuminant (`power`), observer (`X`/`Y`/`Z`) and the training reflectances
/// (one channel per patch). The IDT slot starts as identity and keeps its
/// last solved value if a later solve fails.
#[derive(Clone, Debug)]
pub struct SpectralSolver {
    search_directories: Vec<PathBuf>,

    pub camera: Option<SpectralData>,
    pub illuminant: Option<SpectralData>,
    pub observer: Option<SpectralData>,
    pub training_data: Option<SpectralData>,

    wb_multipliers: [Float; 3],
    idt_matrix: SquareMatrix<3>,
    all_illuminants: Vec<SpectralData>,
}

impl SpectralSolver {
    pub fn new(search_directories: Vec<PathBuf>) -> Self {
        Self {
            search_directories,
            camera: None,
            illuminant: None,
            observer: None,
            training_data: None,
            wb_multipliers: [1.0; 3],
            idt_matrix: SquareMatrix::IDENTITY,
            all_illuminants: Vec::new(),
        }
    }

    /// `.json` files of one data type across the search directories, in
    /// search-path order. Missing directories are skipped with a warning.
    fn collect_data_files(&self, data_type: &str) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for directory in &self.search_directories {
            let type_path = directory.join(data_type);
            let entries = match fs::read_dir(&type_path) {
                Ok(entries) => entries,
                Err(_) => {
                    warn!(path = %type_path.display(), "database directory does not exist");
                    continue;
                }
            };

            let mut batch: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .collect();
            batch.sort();
            files.extend(batch);
        }

        files
    }

    /// Load one spectral data file. Relative paths resolve against the
    /// search directories in order.
    pub fn load_spectral_data(&self, file_path: impl AsRef<Path>) -> Result<SpectralData> {
        let file_path = file_path.as_ref();

        if file_path.is_absolute() {
            return SpectralData::load(file_path);
        }

        for directory in &self.search_directories {
            let candidate = directory.join(file_path);
            if candidate.exists() {
                return SpectralData::load(&candidate);
            }
        }

        Err(Error::load_failure(
            file_path,
            "not found in any search directory",
        ))
    }

    /// Load the first camera database file matching make and model
    /// (case-insensitive) into the camera slot.
    pub fn find_camera(&mut self, make: &str, model: &str) -> Result<()> {
        for path in self.collect_data_files("camera") {
            let data = match SpectralData::load(&path) {
                Ok(data) => data,
                Err(err) => {
                    debug!(%err, "skipping unreadable camera file");
                    continue;
                }
            };

            if data.manufacturer.eq_ignore_ascii_case(make) && data.model.eq_ignore_ascii_case(model)
            {
                self.camera = Some(data);
                return Ok(());
            }
        }

        Err(Error::Unmatched(format!("camera '{make} {model}'")))
    }

    /// Fill the illuminant slot from a textual tag: `d..` synthesizes
    /// daylight, `..k` a blackbody, anything else searches the database.
    pub fn find_illuminant(&mut self, tag: &str) -> Result<()> {
        match classify_tag(tag) {
            IlluminantKind::Daylight(cct) => {
                self.illuminant = Some(generate_illuminant(cct, &format!("d{cct}"), true)?);
            }
            IlluminantKind::Blackbody(cct) => {
                self.illuminant = Some(generate_illuminant(cct, &format!("{cct}k"), false)?);
            }
            IlluminantKind::Named(name) => {
                for path in self.collect_data_files("illuminant") {
                    let data = match SpectralData::load(&path) {
                        Ok(data) => data,
                        Err(err) => {
                            debug!(%err, "skipping unreadable illuminant file");
                            continue;
                        }
                    };

                    if data.illuminant.eq_ignore_ascii_case(&name) {
                        self.illuminant = Some(data);
                        return Ok(());
                    }
                }
                return Err(Error::Unmatched(format!("illuminant '{tag}'")));
            }
        }

        Ok(())
    }

    /// Pick the candidate illuminant whose white balance best matches the
    /// given multipliers, storing both the illuminant and its multipliers.
    ///
    /// The candidate pool is built once per solver: synthesized daylight
    /// (4000-25000 K in 500 K steps), blackbody (1500-3500 K), then every
    /// loadable database illuminant.
    pub fn find_illuminant_by_wb(&mut self, wb_multipliers: [Float; 3]) -> Result<()> {
        let Some(camera) = &self.camera else {
            return Err(Error::NotConfigured {
                slot: "camera",
                operation: "find_illuminant_by_wb",
            });
        };
        if camera.channel_count() != 3 {
            return Err(Error::NotConfigured {
                slot: "camera",
                operation: "find_illuminant_by_wb",
            });
        }

        if self.all_illuminants.is_empty() {
            let mut pool = Vec::new();

            for cct in (4000..=25000).step_by(500) {
                pool.push(generate_illuminant(cct, &format!("d{}", cct / 100), true)?);
            }
            for cct in (1500..4000).step_by(500) {
                pool.push(generate_illuminant(cct, &format!("{cct}k"), false)?);
            }
            for path in self.collect_data_files("illuminant") {
                match SpectralData::load(&path) {
                    Ok(data) => pool.push(data),
                    Err(err) => debug!(%err, "dropping illuminant from the candidate pool"),
                }
            }

            self.all_illuminants = pool;
        }

        let mut candidate_wbs = Vec::with_capacity(self.all_illuminants.len());
        for candidate in self.all_illuminants.iter_mut() {
            candidate_wbs.push(white_balance(camera, candidate)?);
        }

        // Ties resolve to the earliest candidate in pool order.
        let Some(best) = candidate_wbs
            .iter()
            .map(|&candidate_wb| wb_sse(candidate_wb, wb_multipliers))
            .position_min_by(|a, b| a.partial_cmp(b).expect("WB errors must not be NaN"))
        else {
            return Err(Error::Unmatched(
                "an illuminant matching the white balance".into(),
            ));
        };

        let chosen = self.all_illuminants[best].clone();
        debug!(illuminant = %chosen.illuminant, "best white-balance match");
        self.illuminant = Some(chosen);
        self.wb_multipliers = candidate_wbs[best];

        Ok(())
    }

    /// Compute the white-balance multipliers from the camera and illuminant
    /// slots. The illuminant is scaled in place as a side effect.
    pub fn calculate_wb(&mut self) -> Result<()> {
        const OPERATION: &str = "calculate_wb";

        let camera = configured(&self.camera, 3, "camera", OPERATION)?;
        let illuminant = match &mut self.illuminant {
            Some(data) if data.channel_count() == 1 => data,
            _ => {
                return Err(Error::NotConfigured {
                    slot: "illuminant",
                    operation: OPERATION,
                })
            }
        };

        self.wb_multipliers = white_balance(camera, illuminant)?;
        Ok(())
    }

    /// Run the full IDT solve. Requires the camera, illuminant, observer and
    /// training slots; uses the current WB multipliers.
    pub fn calculate_idt_matrix(&mut self) -> Result<()> {
        const OPERATION: &str = "calculate_idt_matrix";

        let camera = configured(&self.camera, 3, "camera", OPERATION)?;
        let illuminant = configured(&self.illuminant, 1, "illuminant", OPERATION)?;
        let observer = configured(&self.observer, 3, "observer", OPERATION)?;
        let training_data = match &self.training_data {
            Some(data) if data.channel_count() > 0 => data,
            _ => {
                return Err(Error::NotConfigured {
                    slot: "training_data",
                    operation: OPERATION,
                })
            }
        };

        let radiances = training_radiances(illuminant, training_data)?;
        let rgb = white_balanced_rgb(camera, self.wb_multipliers, &radiances)?;
        let xyz = adapted_xyz(observer, illuminant, &radiances)?;

        self.idt_matrix = fit::solve_idt(&rgb, &xyz)?;
        Ok(())
    }

    pub fn idt_matrix(&self) -> &SquareMatrix<3> {
        &self.idt_matrix
    }

    pub fn wb_multipliers(&self) -> [Float; 3] {
        self.wb_multipliers
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use crate::spectral::SpectralShape;

    use super::*;

    fn gaussian(center: Float, width: Float, peak: Float) -> Spectrum {
        let shape = SpectralShape::VISIBLE;
        let values = shape
            .wavelengths()
            .map(|wl| {
                let d = (wl as Float - center) / width;
                peak * (-0.5 * d * d).exp()
            })
            .collect();
        Spectrum::new(shape, values).unwrap()
    }

    fn synthetic_camera() -> SpectralData {
        let mut camera = SpectralData::default();
        camera.manufacturer = "synthetic".into();
        camera.model = "mk1".into();
        camera.insert_channel("main", "R", gaussian(610.0, 40.0, 0.9)).unwrap();
        camera.insert_channel("main", "G", gaussian(540.0, 45.0, 1.0)).unwrap();
        camera.insert_channel("main", "B", gaussian(465.0, 35.0, 0.8)).unwrap();
        camera
    }

    fn synthetic_observer() -> SpectralData {
        let mut observer = SpectralData::default();
        observer.insert_channel("main", "X", gaussian(595.0, 45.0, 1.05)).unwrap();
        observer.insert_channel("main", "Y", gaussian(555.0, 50.0, 1.0)).unwrap();
        observer.insert_channel("main", "Z", gaussian(450.0, 30.0, 1.7)).unwrap();
        observer
    }

    fn synthetic_training() -> SpectralData {
        let mut training = SpectralData::default();
        let centers = [420.0, 460.0, 500.0, 540.0, 580.0, 620.0, 660.0, 700.0];
        for (i, &center) in centers.iter().enumerate() {
            training
                .insert_channel("main", &format!("patch{i:02}"), gaussian(center, 60.0, 0.7))
                .unwrap();
        }
        // A flat grey patch keeps the fit anchored near neutral.
        let flat = Spectrum::new(
            SpectralShape::VISIBLE,
            vec![0.18; SpectralShape::VISIBLE.sample_count()],
        )
        .unwrap();
        training.insert_channel("main", "grey", flat).unwrap();
        training
    }

    fn solver_with_synthetic_data() -> SpectralSolver {
        let mut solver = SpectralSolver::new(Vec::new());
        solver.camera = Some(synthetic_camera());
        solver.observer = Some(synthetic_observer());
        solver.training_data = Some(synthetic_training());
        solver
    }

    #[test]
    fn white_balance_green_is_exactly_one() {
        let mut solver = solver_with_synthetic_data();
        solver.find_illuminant("d55").unwrap();
        solver.calculate_wb().unwrap();

        let wb = solver.wb_multipliers();
        assert_eq!(wb[1], 1.0);
        assert!(wb[0] > 0.0 && wb[2] > 0.0);
    }

    #[test]
    fn white_balance_is_scale_invariant() {
        let camera = synthetic_camera();
        let mut illuminant = generate_illuminant(55, "d55", true).unwrap();

        let first = white_balance(&camera, &mut illuminant).unwrap();
        illuminant.channel_mut("power").unwrap().scale(3.0);
        let second = white_balance(&camera, &mut illuminant).unwrap();

        for c in 0..3 {
            assert_relative_eq!(first[c], second[c], max_relative = 1e-12);
        }
    }

    #[test]
    fn scale_illuminant_normalises_the_peak_channel() {
        let camera = synthetic_camera();
        let mut illuminant = generate_illuminant(55, "d55", true).unwrap();
        scale_illuminant(&camera, &mut illuminant).unwrap();

        // Green has the largest spectral maximum in the synthetic camera.
        let response = camera
            .channel("G")
            .unwrap()
            .product(illuminant.channel("power").unwrap())
            .unwrap();
        assert_relative_eq!(response.integrate(), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn camera_multipliers_normalise_to_the_strongest_channel() {
        let camera = synthetic_camera();
        let mut illuminant = generate_illuminant(55, "d55", true).unwrap();
        scale_illuminant(&camera, &mut illuminant).unwrap();

        let multipliers = camera_multipliers(&camera, &illuminant).unwrap();
        let min = multipliers.iter().cloned().fold(Float::INFINITY, Float::min);
        assert_relative_eq!(min, 1.0, max_relative = 1e-12);
        assert!(multipliers.iter().all(|&m| m >= 1.0));
    }

    #[test]
    fn idt_rows_sum_to_one_and_solve_is_deterministic() {
        let mut solver = solver_with_synthetic_data();
        solver.find_illuminant("d55").unwrap();
        solver.calculate_wb().unwrap();
        solver.calculate_idt_matrix().unwrap();
        let first = *solver.idt_matrix();

        for i in 0..3 {
            let row = first.row(i);
            assert_abs_diff_eq!(row[0] + row[1] + row[2], 1.0, epsilon = 1e-12);
        }

        solver.calculate_idt_matrix().unwrap();
        assert_eq!(first, *solver.idt_matrix());
    }

    #[test]
    fn best_match_search_recovers_the_source_illuminant() {
        let mut solver = solver_with_synthetic_data();
        solver.find_illuminant("d55").unwrap();
        solver.calculate_wb().unwrap();
        let wb = solver.wb_multipliers();

        let mut fresh = solver_with_synthetic_data();
        fresh.find_illuminant_by_wb(wb).unwrap();

        let chosen = fresh.illuminant.as_ref().unwrap();
        assert_eq!(chosen.illuminant, "d55");
        for c in 0..3 {
            assert_relative_eq!(fresh.wb_multipliers()[c], wb[c], max_relative = 1e-3);
        }
    }

    #[test]
    fn solves_require_configured_slots() {
        let mut solver = SpectralSolver::new(Vec::new());
        assert!(matches!(
            solver.calculate_wb(),
            Err(Error::NotConfigured { slot: "camera", .. })
        ));
        assert!(matches!(
            solver.find_illuminant_by_wb([1.0, 1.0, 1.0]),
            Err(Error::NotConfigured { slot: "camera", .. })
        ));

        solver.camera = Some(synthetic_camera());
        assert!(matches!(
            solver.calculate_wb(),
            Err(Error::NotConfigured {
                slot: "illuminant",
                ..
            })
        ));
        assert!(matches!(
            solver.calculate_idt_matrix(),
            Err(Error::NotConfigured {
                slot: "illuminant",
                ..
            })
        ));
    }

    const CAMERA_DB_JSON: &str = r#"{
        "header": { "manufacturer": "Acme", "model": "Star 7" },
        "spectral_data": {
            "index": { "main": ["R", "G", "B"] },
            "data": {
                "R": { "start": 380, "end": 390, "step": 5, "values": [0.1, 0.2, 0.3] },
                "G": { "start": 380, "end": 390, "step": 5, "values": [0.4, 0.5, 0.6] },
                "B": { "start": 380, "end": 390, "step": 5, "values": [0.7, 0.8, 0.9] }
            }
        }
    }"#;

    const ILLUMINANT_DB_JSON: &str = r#"{
        "header": { "illuminant": "studio_led" },
        "spectral_data": {
            "index": { "main": ["power"] },
            "data": {
                "power": { "start": 380, "end": 390, "step": 5, "values": [1.0, 1.0, 1.0] }
            }
        }
    }"#;

    fn database_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("camera")).unwrap();
        fs::create_dir_all(root.join("illuminant")).unwrap();
        fs::write(root.join("camera/acme_star7.json"), CAMERA_DB_JSON).unwrap();
        fs::write(root.join("illuminant/studio_led.json"), ILLUMINANT_DB_JSON).unwrap();
        // A broken file in the pool must be skipped, not abort the search.
        fs::write(root.join("illuminant/broken.json"), "{").unwrap();
        root
    }

    #[test]
    fn find_camera_matches_case_insensitively() {
        let root = database_root("aces_idt_db_camera");
        let mut solver = SpectralSolver::new(vec![root]);

        solver.find_camera("ACME", "star 7").unwrap();
        assert_eq!(solver.camera.as_ref().unwrap().model, "Star 7");

        assert!(matches!(
            solver.find_camera("acme", "nova"),
            Err(Error::Unmatched(_))
        ));
    }

    #[test]
    fn find_illuminant_searches_the_database_for_plain_names() {
        let root = database_root("aces_idt_db_illum");
        let mut solver = SpectralSolver::new(vec![root]);

        solver.find_illuminant("STUDIO_LED").unwrap();
        assert_eq!(solver.illuminant.as_ref().unwrap().illuminant, "studio_led");

        assert!(matches!(
            solver.find_illuminant("tungsten_halogen"),
            Err(Error::Unmatched(_))
        ));
    }

    #[test]
    fn load_spectral_data_resolves_relative_paths() {
        let root = database_root("aces_idt_db_load");
        let solver = SpectralSolver::new(vec![root]);

        let data = solver.load_spectral_data("camera/acme_star7.json").unwrap();
        assert_eq!(data.manufacturer, "Acme");

        assert!(matches!(
            solver.load_spectral_data("camera/missing.json"),
            Err(Error::LoadFailure { .. })
        ));
    }
}
