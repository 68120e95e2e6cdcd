//! Time-averaged wall shear stress post-processor.
//!
//! Walks the time directories of a simulation case, computes the wall
//! traction (WSS) on every boundary face at each snapshot, and maintains a
//! cumulative running average (TAWSSPP) written out after every timestep.
//! Supports incompressible (viscosity field, constant density) and
//! compressible (density field, density-weighted stress) regimes.

pub mod average;
pub mod case;
pub mod closure;
pub mod datatypes;
pub mod driver;
pub mod error;
pub mod traction;
