use crate::core::event::EventKey;
use crate::core::lattice::Coord;
use slotmap::new_key_type;

new_key_type! {
    /// Generational handle to an object owned by the engine.
    ///
    /// Handles are `Copy`, hashable, and go stale once the object is removed;
    /// engine accessors reject stale handles instead of aliasing a reused slot.
    pub struct ObjectKey;
}

/// Common state embedded by every concrete object kind.
#[derive(Debug, Clone)]
pub struct ObjectBase {
    id: u64,
    coords: Coord,
    event: EventKey,
    creation_time: f64,
}

impl ObjectBase {
    /// Create the shared state for a new object at `coords`.
    pub fn new(id: u64, coords: Coord, creation_time: f64) -> Self {
        Self {
            id,
            coords,
            event: EventKey::default(),
            creation_time,
        }
    }
}

/// A mobile object resident on the lattice.
///
/// Concrete kinds embed an [`ObjectBase`] and expose it through `base` /
/// `base_mut`; the accessors below are provided on top of it. The engine
/// never interprets the concrete kind.
pub trait Object {
    /// Shared object state.
    fn base(&self) -> &ObjectBase;

    /// Mutable shared object state.
    fn base_mut(&mut self) -> &mut ObjectBase;

    /// Kind name of the concrete object.
    fn name(&self) -> &'static str {
        "Object"
    }

    /// Stable identifier assigned at creation.
    fn id(&self) -> u64 {
        self.base().id
    }

    /// Current lattice coordinates.
    fn coords(&self) -> Coord {
        self.base().coords
    }

    /// Set the current lattice coordinates. Occupancy bookkeeping is the
    /// engine's job; domain code moves objects via `Simulation::move_object`.
    fn set_coords(&mut self, coords: Coord) {
        self.base_mut().coords = coords;
    }

    /// Handle of this object's pending-event slot.
    fn event_key(&self) -> EventKey {
        self.base().event
    }

    /// Link this object to its pending-event slot.
    fn set_event_key(&mut self, key: EventKey) {
        self.base_mut().event = key;
    }

    /// Simulation time at which the object was created.
    fn creation_time(&self) -> f64 {
        self.base().creation_time
    }
}
