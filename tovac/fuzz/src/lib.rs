//! Structured input generators for the Tova fuzz targets.

pub mod grammar;
