//! Core data model and engine for kinetic Monte Carlo lattice simulations.
//!
//! The engine advances a population of mobile objects on a dense 3D site
//! grid by repeatedly selecting the pending event with the smallest sampled
//! wait time (First Reaction Method). Concrete object and event kinds live
//! in domain crates; everything here is domain-agnostic.

pub mod event;
pub mod lattice;
pub mod object;
pub mod site;
pub mod sim;

pub use event::{Event, EventBase, EventKey, EventRng};
pub use lattice::{min_image_delta_axis, wrap_delta_axis, Coord, Lattice};
pub use object::{Object, ObjectBase, ObjectKey};
pub use sim::{remove_object_ref_duplicates, Parameters, Simulation};
pub use site::Site;
