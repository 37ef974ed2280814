//! Trade point selection over forecast trajectories.

pub mod extrema;

pub use extrema::select_extrema;
