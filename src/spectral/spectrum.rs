use crate::error::{Error, Result};
use crate::Float;

/// Uniform sampling grid of a spectral curve, in nanometers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpectralShape {
    pub start: i32,
    pub end: i32,
    pub step: i32,
}

impl SpectralShape {
    /// The canonical visible-range sampling: 380-780 nm at 5 nm (81 samples).
    pub const VISIBLE: Self = Self {
        start: 380,
        end: 780,
        step: 5,
    };

    pub fn sample_count(&self) -> usize {
        ((self.end - self.start) / self.step + 1) as usize
    }

    pub fn wavelengths(&self) -> impl Iterator<Item = i32> + '_ {
        (self.start..=self.end).step_by(self.step as usize)
    }

    fn validate(&self) -> Result<()> {
        if self.step < 1 || self.end <= self.start || (self.end - self.start) % self.step != 0 {
            return Err(Error::DataShape(format!(
                "invalid sampling shape {}-{} nm at {} nm",
                self.start, self.end, self.step
            )));
        }
        Ok(())
    }
}

/// A finite, uniformly sampled spectral curve.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    shape: SpectralShape,
    values: Vec<Float>,
}

impl Spectrum {
    pub fn new(shape: SpectralShape, values: Vec<Float>) -> Result<Self> {
        shape.validate()?;
        if values.len() != shape.sample_count() {
            return Err(Error::DataShape(format!(
                "expected {} samples for {}-{} nm at {} nm, got {}",
                shape.sample_count(),
                shape.start,
                shape.end,
                shape.step,
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    pub fn shape(&self) -> SpectralShape {
        self.shape
    }

    pub fn values(&self) -> &[Float] {
        &self.values
    }

    /// Pointwise product over the wavelength range common to both curves.
    /// The operands must share `step` and align on the same grid.
    pub fn product(&self, other: &Spectrum) -> Result<Spectrum> {
        let a = self.shape;
        let b = other.shape;

        if a.step != b.step {
            return Err(Error::DataShape(format!(
                "cannot multiply spectra sampled at {} nm and {} nm",
                a.step, b.step
            )));
        }
        if (b.start - a.start) % a.step != 0 {
            return Err(Error::DataShape(format!(
                "spectra grids are offset: starts {} nm and {} nm at {} nm step",
                a.start, b.start, a.step
            )));
        }

        let start = a.start.max(b.start);
        let end = a.end.min(b.end);
        if end <= start {
            return Err(Error::DataShape(format!(
                "spectra do not overlap: {}-{} nm and {}-{} nm",
                a.start, a.end, b.start, b.end
            )));
        }

        let shape = SpectralShape {
            start,
            end,
            step: a.step,
        };
        let values = shape
            .wavelengths()
            .map(|wl| {
                let i = ((wl - a.start) / a.step) as usize;
                let j = ((wl - b.start) / b.step) as usize;
                self.values[i] * other.values[j]
            })
            .collect();

        Spectrum::new(shape, values)
    }

    /// Riemann-sum integral: the sample sum times the step width.
    /// Only ever used in ratios, so the absolute unit cancels out.
    pub fn integrate(&self) -> Float {
        self.values.iter().sum::<Float>() * self.shape.step as Float
    }

    /// Multiply every sample in place.
    pub fn scale(&mut self, factor: Float) {
        for v in self.values.iter_mut() {
            *v *= factor;
        }
    }

    pub fn max_value(&self) -> Result<Float> {
        self.values
            .iter()
            .copied()
            .max_by(|a, b| a.partial_cmp(b).expect("spectrum values must not be NaN"))
            .ok_or_else(|| Error::DataShape("empty spectrum has no maximum".into()))
    }
}
