//! Hierarchical string labels and their dense integer codes.
//!
//! Raw labels mirror the directory layout of a dataset, e.g. `/azurite/spot02`.
//! Every segment of a raw label starts with `/`.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Hierarchical label as read from the dataset source.
pub type Raw = String;

/// Dense label code, assigned on first encounter.
pub type Num = usize;

const SEPARATOR: char = '/';

/// Bidirectional mapping between raw labels and their codes.
///
/// A `&mut Codec` may grow; a shared `&Codec` is frozen and only answers
/// lookups, which keeps train and test encodings in the same label space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Codec {
    codes: BTreeMap<Raw, Num>,
    labels: Vec<Raw>,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a codec by encoding `labels` in iteration order.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut codec = Self::new();
        for l in labels {
            codec.encode(l.as_ref());
        }
        codec
    }

    /// Code of `label`, assigning the next free code when it is new.
    pub fn encode(&mut self, label: &str) -> Num {
        if let Some(&code) = self.codes.get(label) {
            return code;
        }
        let code = self.labels.len();
        self.codes.insert(label.to_string(), code);
        self.labels.push(label.to_string());
        code
    }

    /// Code of a label this codec has already seen.
    pub fn encode_existing(&self, label: &str) -> Result<Num> {
        self.codes
            .get(label)
            .copied()
            .ok_or_else(|| Error::UnknownLabel {
                label: label.to_string(),
            })
    }

    pub fn decode(&self, code: Num) -> Result<&str> {
        self.labels
            .get(code)
            .map(String::as_str)
            .ok_or(Error::UnknownCode { code })
    }

    /// A codec over the distinct heads of every known label, renumbered from
    /// zero in first-seen order. Meant for coarse-grained reporting only.
    pub fn headonly(&self) -> Result<Codec> {
        let mut ret = Codec::new();
        for l in &self.labels {
            ret.encode(head(l)?);
        }
        Ok(ret)
    }

    /// Known labels in code order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (code, label) in self.labels.iter().enumerate() {
            if code > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label}: {code}")?;
        }
        Ok(())
    }
}

/// First segment of a hierarchical label, leading separator included.
///
/// `/azurite/spot00` → `/azurite`.
pub fn head(label: &str) -> Result<&str> {
    if !label.starts_with(SEPARATOR) {
        return Err(Error::LabelStructure {
            label: label.to_string(),
        });
    }
    let end = label[1..]
        .find(SEPARATOR)
        .map_or(label.len(), |pos| pos + 1);
    Ok(&label[..end])
}
