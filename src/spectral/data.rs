use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::spectral::{SpectralShape, Spectrum};
use crate::Float;

/// The conventional group name holding a bundle's channels.
pub(crate) const MAIN_GROUP: &str = "main";

/// A named bundle of spectral curves sharing one sampling grid.
///
/// Channel order within a group is part of the data model: training patches
/// are solved in the order they appear in the file.
#[derive(Clone, Debug, Default)]
pub struct SpectralData {
    pub manufacturer: String,
    pub model: String,
    /// Non-empty when this bundle describes a named illuminant.
    pub illuminant: String,
    pub units: String,
    /// Provenance keys from the file header, preserved but not interpreted.
    pub header_extra: BTreeMap<String, serde_json::Value>,
    groups: Vec<(String, Vec<(String, Spectrum)>)>,
}

impl SpectralData {
    /// Sampling grid shared by every channel, if any channel exists.
    pub fn shape(&self) -> Option<SpectralShape> {
        self.groups
            .first()
            .and_then(|(_, channels)| channels.first())
            .map(|(_, spectrum)| spectrum.shape())
    }

    /// Append a channel, enforcing the common sampling grid.
    pub fn insert_channel(&mut self, group: &str, name: &str, spectrum: Spectrum) -> Result<()> {
        if let Some(shape) = self.shape() {
            if spectrum.shape() != shape {
                return Err(Error::DataShape(format!(
                    "channel '{name}' is sampled {:?}, the bundle uses {:?}",
                    spectrum.shape(),
                    shape
                )));
            }
        }

        let channels = match self.groups.iter_mut().find(|(g, _)| g == group) {
            Some((_, channels)) => channels,
            None => {
                self.groups.push((group.to_string(), Vec::new()));
                &mut self.groups.last_mut().unwrap().1
            }
        };
        channels.push((name.to_string(), spectrum));
        Ok(())
    }

    /// Ordered channels of a group.
    pub fn group(&self, group: &str) -> Result<&[(String, Spectrum)]> {
        self.groups
            .iter()
            .find(|(g, _)| g == group)
            .map(|(_, channels)| channels.as_slice())
            .ok_or_else(|| Error::DataShape(format!("no '{group}' group in spectral data")))
    }

    /// Number of channels in the main group.
    pub fn channel_count(&self) -> usize {
        self.group(MAIN_GROUP).map_or(0, |channels| channels.len())
    }

    /// Look up a main-group channel by name.
    pub fn channel(&self, name: &str) -> Result<&Spectrum> {
        self.group(MAIN_GROUP)?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spectrum)| spectrum)
            .ok_or_else(|| Error::DataShape(format!("no '{name}' channel in spectral data")))
    }

    pub fn channel_mut(&mut self, name: &str) -> Result<&mut Spectrum> {
        self.groups
            .iter_mut()
            .find(|(g, _)| g == MAIN_GROUP)
            .and_then(|(_, channels)| channels.iter_mut().find(|(n, _)| n == name))
            .map(|(_, spectrum)| spectrum)
            .ok_or_else(|| Error::DataShape(format!("no '{name}' channel in spectral data")))
    }

    /// Load a bundle from a database JSON file.
    pub fn load(path: &Path) -> Result<SpectralData> {
        let text =
            fs::read_to_string(path).map_err(|err| Error::load_failure(path, err))?;
        let file: DataFile =
            serde_json::from_str(&text).map_err(|err| Error::load_failure(path, err))?;

        let units = if file.spectral_data.units.is_empty() {
            file.header.units
        } else {
            file.spectral_data.units
        };

        let mut data = SpectralData {
            manufacturer: file.header.manufacturer,
            model: file.header.model,
            illuminant: file.header.illuminant,
            units,
            header_extra: file.header.extra,
            groups: Vec::new(),
        };

        for (group, names) in &file.spectral_data.index {
            for name in names {
                let samples = file.spectral_data.data.get(name).ok_or_else(|| {
                    Error::load_failure(path, format!("channel '{name}' is indexed but has no data"))
                })?;
                let shape = SpectralShape {
                    start: samples.start,
                    end: samples.end,
                    step: samples.step,
                };
                let spectrum = Spectrum::new(shape, samples.values.clone())
                    .map_err(|err| Error::load_failure(path, err))?;
                data.insert_channel(group, name, spectrum)
                    .map_err(|err| Error::load_failure(path, err))?;
            }
        }

        Ok(data)
    }
}

#[derive(Deserialize)]
struct DataFile {
    header: Header,
    spectral_data: SpectralBlock,
}

#[derive(Deserialize)]
struct Header {
    #[serde(default)]
    manufacturer: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    illuminant: String,
    #[serde(default)]
    units: String,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct SpectralBlock {
    #[serde(default)]
    units: String,
    index: BTreeMap<String, Vec<String>>,
    data: BTreeMap<String, ChannelSamples>,
}

#[derive(Deserialize)]
struct ChannelSamples {
    start: i32,
    end: i32,
    step: i32,
    values: Vec<Float>,
}
