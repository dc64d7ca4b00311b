//! Plots of differential expression results.

pub mod volcano;

pub use volcano::{plot_volcano, VolcanoOptions, VolcanoPoint, VolcanoPoints};
