use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::label::{Codec, Num, Raw};

// ---------------------------------------------------------------------------
// Spectrum – one measurement
// ---------------------------------------------------------------------------

/// Number of intensity values in one spectrometer reading.
pub const NUM_POINTS: usize = 7810;

/// Wavelength of the first point, nm.
pub const WAVELENGTH_START: f64 = 180.0;

/// Distance between neighbouring points, nm.
pub const WAVELENGTH_STEP: f64 = 0.1;

/// Wavelength (nm) of point `i` on the shared axis. 180.0 nm to 960.9 nm.
pub fn wavelength(i: usize) -> f64 {
    WAVELENGTH_START + WAVELENGTH_STEP * i as f64
}

/// A single measurement, or a feature vector derived from one.
///
/// Readings straight from the dataset source hold [`NUM_POINTS`] intensities
/// (radiance, W·sr⁻¹·m⁻²) along the wavelength axis. After dimensionality
/// reduction the same type carries the much shorter feature vector and the
/// index is a feature index instead of a wavelength.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub y: Vec<f64>,
}

impl Spectrum {
    pub fn new(y: Vec<f64>) -> Self {
        Self { y }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.y.is_empty() {
            return 0.0;
        }
        self.y.iter().sum::<f64>() / self.y.len() as f64
    }

    /// Population variance of the values.
    pub fn variance(&self) -> f64 {
        if self.y.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.y.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / self.y.len() as f64
    }
}

impl From<Vec<f64>> for Spectrum {
    fn from(y: Vec<f64>) -> Self {
        Self::new(y)
    }
}

// ---------------------------------------------------------------------------
// DataRaw – string labelled spectra
// ---------------------------------------------------------------------------

/// Spectra keyed by their hierarchical label, as produced by the loader.
pub type DataRaw = BTreeMap<Raw, Vec<Spectrum>>;

/// Total number of spectra in a raw dataset.
pub fn count_raw(raw: &DataRaw) -> usize {
    raw.values().map(Vec::len).sum()
}

// ---------------------------------------------------------------------------
// Dataset – code labelled spectra plus the codec that produced the codes
// ---------------------------------------------------------------------------

/// Encoded dataset. Every key is decodable by the paired codec, so any
/// prediction can be traced back to its raw label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    data: BTreeMap<Num, Vec<Spectrum>>,
    codec: Codec,
}

impl Dataset {
    /// An empty dataset speaking the label space of `codec`.
    pub fn with_codec(codec: Codec) -> Self {
        Self {
            data: BTreeMap::new(),
            codec,
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Add a spectrum under an existing code.
    pub fn push(&mut self, label: Num, spectrum: Spectrum) -> Result<()> {
        self.codec.decode(label)?;
        self.data.entry(label).or_default().push(spectrum);
        Ok(())
    }

    /// Labels present in the data together with their spectra, in code order.
    pub fn classes(&self) -> impl Iterator<Item = (Num, &[Spectrum])> {
        self.data.iter().map(|(&l, v)| (l, v.as_slice()))
    }

    pub fn get(&self, label: Num) -> Option<&[Spectrum]> {
        self.data.get(&label).map(Vec::as_slice)
    }

    /// Visit every element. The walk order is fixed for an unmodified
    /// dataset: codes ascending, spectra in insertion order.
    pub fn apply<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(Num, &'a Spectrum),
    {
        for (&label, spectra) in &self.data {
            for s in spectra {
                f(label, s);
            }
        }
    }

    /// Rewrite every element in place, in the same order as [`Dataset::apply`].
    pub fn mutate<F>(&mut self, mut f: F)
    where
        F: FnMut(Num, &mut Spectrum),
    {
        for (&label, spectra) in &mut self.data {
            for s in spectra {
                f(label, s);
            }
        }
    }

    /// Total number of spectra across all labels.
    pub fn count(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Number of labels that hold at least one spectrum.
    pub fn num_classes(&self) -> usize {
        self.data.values().filter(|v| !v.is_empty()).count()
    }

    /// Length of the stored vectors, `None` for an empty dataset.
    ///
    /// Fails when vectors of different lengths are mixed.
    pub fn dim(&self) -> Result<Option<usize>> {
        let mut dim = None;
        let mut mismatch = None;
        self.apply(|_, s| {
            let current: Option<usize> = dim;
            match current {
                None => dim = Some(s.len()),
                Some(d) if d != s.len() && mismatch.is_none() => mismatch = Some(s.len()),
                Some(_) => {}
            }
        });
        match (dim, mismatch) {
            (Some(expected), Some(found)) => Err(Error::DimensionMismatch { expected, found }),
            (dim, _) => Ok(dim),
        }
    }

    /// Labels and spectra in walk order, as two parallel vectors.
    pub fn flatten(&self) -> (Vec<Num>, Vec<&Spectrum>) {
        let mut labels = Vec::with_capacity(self.count());
        let mut spectra = Vec::with_capacity(self.count());
        self.apply(|l, s| {
            labels.push(l);
            spectra.push(s);
        });
        (labels, spectra)
    }

    /// Consume the dataset, applying `f` to every vector. Labels and codec
    /// are carried over unchanged.
    pub fn map<F>(self, mut f: F) -> Result<Dataset>
    where
        F: FnMut(Spectrum) -> Result<Spectrum>,
    {
        let mut data = BTreeMap::new();
        for (label, spectra) in self.data {
            let mapped = spectra
                .into_iter()
                .map(&mut f)
                .collect::<Result<Vec<_>>>()?;
            data.insert(label, mapped);
        }
        Ok(Dataset {
            data,
            codec: self.codec,
        })
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a raw dataset with a fresh codec built from its own labels.
pub fn encode(raw: DataRaw) -> Dataset {
    let mut dataset = Dataset::default();
    for (label, spectra) in raw {
        let code = dataset.codec.encode(&label);
        dataset.data.insert(code, spectra);
    }
    dataset
}

/// Encode a raw dataset against an existing, frozen codec.
///
/// A label the codec has never seen fails with `UnknownLabel` instead of
/// silently opening a new class.
pub fn encode_with(raw: DataRaw, codec: &Codec) -> Result<Dataset> {
    let mut dataset = Dataset::with_codec(codec.clone());
    for (label, spectra) in raw {
        let code = codec.encode_existing(&label)?;
        dataset.data.entry(code).or_default().extend(spectra);
    }
    Ok(dataset)
}

/// Inverse of [`encode`], for diagnostics.
pub fn decode(dataset: Dataset, codec: &Codec) -> Result<DataRaw> {
    let mut raw = DataRaw::new();
    for (code, spectra) in dataset.data {
        let label = codec.decode(code)?;
        raw.entry(label.to_string()).or_default().extend(spectra);
    }
    Ok(raw)
}
