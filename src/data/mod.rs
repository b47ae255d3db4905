//! Data layer: core types, loading, and splitting.
//!
//! Architecture:
//! ```text
//!  <root>/<label>/.../*.csv   |   .parquet / .json
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse files → DataRaw (label → spectra)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  split    │  leave-one-subgroup-out | stratified holdout
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  model    │  encode with a shared codec → Dataset
//!   └──────────┘
//! ```

pub mod loader;
pub mod model;
pub mod split;
