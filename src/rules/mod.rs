//! Disallowed-call rules: normalisation, parameter matchers, translation, and loading.

pub mod factory;
pub mod keyed;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod params;
pub mod summary;
