//! Experiment harness for classifying minerals from optical emission spectra.
//!
//! A labelled directory tree of spectra is split into train and test sets,
//! preprocessed, fed to one of a small set of classifiers and scored with a
//! confusion matrix. [`harness::run`] wires the whole thing together.

pub mod config;
pub mod data;
pub mod dim;
pub mod error;
pub mod eval;
pub mod harness;
pub mod label;
pub mod model;
pub mod pre;
pub mod score;

pub use error::{Error, Result};
