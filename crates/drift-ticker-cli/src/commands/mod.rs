//! Command implementations for tickctl

pub mod clocks;
pub mod run;

pub use run::RunArgs;
