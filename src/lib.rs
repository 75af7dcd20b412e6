//! kmcsim: kinetic Monte Carlo lattice simulation core.
//!
//! The crate provides the domain-agnostic machinery shared by lattice KMC
//! applications:
//!
//! - [`core`]: the simulation engine, a dense 3D site grid with optional
//!   periodic wrap, mobile objects tied one-to-one to pending-event slots,
//!   first-reaction event selection, and deterministic seeded sampling.
//! - [`reduce`]: collective reductions (gathers, averages, aligned-bin
//!   histogram averaging) across a group of worker ranks, generic over a
//!   communicator so the same numeric contracts run in-process for tests
//!   and over MPI in production (enable the `mpi` feature).
//! - [`error`]: the crate-wide error type; nothing is silently recovered.
//!
//! Domain packages supply concrete object and event kinds by implementing
//! [`core::Object`] and [`core::Event`] and drive the loop themselves:
//! choose the next event, advance the clock, execute domain logic through
//! the engine's operations, and recalculate affected neighbors.

pub mod core;
pub mod error;
pub mod reduce;
