//! Reactor Volume Engine.
//!
//! Applies a sequence of reboot steps (axis-aligned 3-D ranges that turn
//! unit cubes on or off) and tracks how many cubes are currently on. Two
//! representations sit behind the [`VolumeStore`] trait: a dense grid for
//! a bounded symmetric envelope, and a sparse coordinate set for
//! unbounded space. [`Reactor::new`] picks one from the configured
//! `side_size` and never changes its mind mid-run.

pub mod step;
pub mod store;

pub use step::{Command, Cuboid, Envelope, FormatError, Step};
pub use store::{ConfigError, Coordinate, DenseStore, Reactor, SparseStore, VolumeStore};
