use crate::core::event::{Event, EventKey, EventRng};
use crate::core::lattice::{Coord, Lattice};
use crate::core::object::{Object, ObjectKey};
use crate::core::site::Site;
use crate::error::{Error, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use slotmap::SlotMap;
use std::collections::HashSet;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

/// Engine configuration consumed at construction.
///
/// `logfile` is an append-only sink; `log_msg` writes to it verbatim when
/// `enable_logging` is set.
pub struct Parameters {
    pub enable_logging: bool,
    pub enable_periodic_x: bool,
    pub enable_periodic_y: bool,
    pub enable_periodic_z: bool,
    /// Lattice extent along x.
    pub length: i32,
    /// Lattice extent along y.
    pub width: i32,
    /// Lattice extent along z.
    pub height: i32,
    /// Physical length per lattice unit.
    pub unit_size: f64,
    /// Passed through to domain rate formulas.
    pub temperature: f64,
    pub enable_recalc: bool,
    /// Physical radius within which events are recomputed after a firing.
    pub recalc_cutoff: f64,
    pub logfile: Option<Box<dyn Write>>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            enable_logging: false,
            enable_periodic_x: false,
            enable_periodic_y: false,
            enable_periodic_z: false,
            length: 0,
            width: 0,
            height: 0,
            unit_size: 1.0,
            temperature: 300.0,
            enable_recalc: false,
            recalc_cutoff: 0.0,
            logfile: None,
        }
    }
}

/// Kinetic Monte Carlo simulation engine.
///
/// The engine owns the lattice, the object set, and the pending-event set.
/// Every live object is tied one-to-one to an event slot; the slot may hold a
/// placeholder between object insertion and the first `set_event`. Drivers
/// select the next event with `choose_next_event`, advance the clock with
/// `increment_time`, and dispatch to domain logic, which mutates state only
/// through the operations below.
pub struct Simulation {
    id: i32,
    time: f64,
    temperature: f64,
    unit_size: f64,
    enable_logging: bool,
    enable_recalc: bool,
    recalc_cutoff: f64,
    lattice: Lattice,
    objects: SlotMap<ObjectKey, Box<dyn Object>>,
    object_order: Vec<ObjectKey>,
    events: SlotMap<EventKey, Option<Box<dyn Event>>>,
    event_order: Vec<EventKey>,
    rng: StdRng,
    event_rng: EventRng,
    n_objects: usize,
    n_objects_created: u64,
    n_events_executed: u64,
    logfile: Option<Box<dyn Write>>,
}

impl Simulation {
    /// Create an engine seeded from the current wallclock, so that runs with
    /// distinct simulation ids launched in the same second stay decorrelated.
    pub fn new(params: Parameters, id: i32) -> Result<Self> {
        let wallclock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::new_at(params, id, wallclock)
    }

    /// Create an engine seeded from an explicit wallclock value.
    ///
    /// Both RNG streams are seeded `wallclock * (id + 1)`; equal arguments
    /// yield an identical trajectory, which is what tests rely on.
    pub fn new_at(params: Parameters, id: i32, wallclock: u64) -> Result<Self> {
        if id < 0 {
            return Err(Error::InvalidArgument(format!(
                "simulation id must be >= 0, got {id}"
            )));
        }
        if !params.unit_size.is_finite() || params.unit_size <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "unit_size must be finite and > 0, got {}",
                params.unit_size
            )));
        }
        if !params.temperature.is_finite() {
            return Err(Error::InvalidArgument(
                "temperature must be finite".to_string(),
            ));
        }
        if !params.recalc_cutoff.is_finite() || params.recalc_cutoff < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "recalc_cutoff must be finite and >= 0, got {}",
                params.recalc_cutoff
            )));
        }
        let lattice = Lattice::new(
            params.length,
            params.width,
            params.height,
            params.enable_periodic_x,
            params.enable_periodic_y,
            params.enable_periodic_z,
        )?;
        let seed = wallclock.wrapping_mul(id as u64 + 1);
        Ok(Self {
            id,
            time: 0.0,
            temperature: params.temperature,
            unit_size: params.unit_size,
            enable_logging: params.enable_logging,
            enable_recalc: params.enable_recalc,
            recalc_cutoff: params.recalc_cutoff,
            lattice,
            objects: SlotMap::with_key(),
            object_order: Vec::new(),
            events: SlotMap::with_key(),
            event_order: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            event_rng: EventRng::seed_from(seed),
            n_objects: 0,
            n_objects_created: 0,
            n_events_executed: 0,
            logfile: params.logfile,
        })
    }

    /// Insert an object, allocate its pending-event slot (initially a
    /// placeholder), and wire the mutual back-references.
    ///
    /// Fails without touching any state if the object's coordinates are
    /// outside the lattice or its site is already occupied.
    pub fn add_object(&mut self, mut object: Box<dyn Object>) -> Result<ObjectKey> {
        let coords = object.coords();
        if self.lattice.is_occupied(coords)? {
            return Err(Error::OccupancyViolation(format!(
                "cannot add object {} at occupied site {coords}",
                object.id()
            )));
        }
        let event_key = self.events.insert(None);
        self.event_order.push(event_key);
        object.set_event_key(event_key);
        let object_key = self.objects.insert(object);
        self.object_order.push(object_key);
        self.lattice.site_mut(coords)?.set_occupied(object_key)?;
        self.n_objects += 1;
        self.n_objects_created += 1;
        self.n_events_executed += 1;
        Ok(object_key)
    }

    /// Append an event not tied to an object and return its slot handle.
    pub fn add_event(&mut self, event: Box<dyn Event>) -> EventKey {
        let key = self.events.insert(Some(event));
        self.event_order.push(key);
        key
    }

    /// Replace the pending event in `slot`; the previous event is dropped.
    ///
    /// Errors with `InvalidArgument` on a stale slot handle.
    pub fn set_event(&mut self, slot: EventKey, event: Box<dyn Event>) -> Result<()> {
        let entry = self
            .events
            .get_mut(slot)
            .ok_or_else(|| Error::InvalidArgument("stale event slot handle".to_string()))?;
        *entry = Some(event);
        Ok(())
    }

    /// Run the domain hook of the event in `slot` against the engine-owned
    /// event RNG stream.
    pub fn calculate_event(&mut self, slot: EventKey, dest: Coord, rate: f64) -> Result<()> {
        let entry = self
            .events
            .get_mut(slot)
            .ok_or_else(|| Error::InvalidArgument("stale event slot handle".to_string()))?;
        let event = entry
            .as_deref_mut()
            .ok_or_else(move || Error::InvalidArgument("event slot holds no event".to_string()))?;
        event.calculate_event(dest, rate, &mut self.event_rng)
    }

    /// Slot holding the pending event with the minimum wait time.
    ///
    /// Linear scan in insertion order; ties resolve to the earliest-inserted
    /// slot. Errors with `EmptyEventSet` when no slot holds an event.
    pub fn choose_next_event(&self) -> Result<EventKey> {
        let mut best: Option<(EventKey, f64)> = None;
        for &key in &self.event_order {
            let Some(Some(event)) = self.events.get(key) else {
                continue;
            };
            let wait = event.wait_time();
            match best {
                Some((_, t)) if wait >= t => {}
                _ => best = Some((key, wait)),
            }
        }
        best.map(|(key, _)| key).ok_or(Error::EmptyEventSet)
    }

    /// Shared access to the pending event in `slot`.
    pub fn event(&self, slot: EventKey) -> Result<&dyn Event> {
        self.events
            .get(slot)
            .ok_or_else(|| Error::InvalidArgument("stale event slot handle".to_string()))?
            .as_deref()
            .ok_or_else(move || Error::InvalidArgument("event slot holds no event".to_string()))
    }

    /// Mutable access to the pending event in `slot`.
    pub fn event_mut(&mut self, slot: EventKey) -> Result<&mut (dyn Event + 'static)> {
        self.events
            .get_mut(slot)
            .ok_or_else(|| Error::InvalidArgument("stale event slot handle".to_string()))?
            .as_deref_mut()
            .ok_or_else(move || Error::InvalidArgument("event slot holds no event".to_string()))
    }

    /// Shared access to a live object.
    pub fn object(&self, key: ObjectKey) -> Result<&dyn Object> {
        self.objects
            .get(key)
            .map(|o| o.as_ref())
            .ok_or_else(move || Error::InvalidArgument("stale object handle".to_string()))
    }

    /// Mutable access to a live object.
    pub fn object_mut(&mut self, key: ObjectKey) -> Result<&mut (dyn Object + 'static)> {
        self.objects
            .get_mut(key)
            .map(|o| o.as_mut())
            .ok_or_else(move || Error::InvalidArgument("stale object handle".to_string()))
    }

    /// Live objects in insertion order.
    pub fn iter_objects(&self) -> impl Iterator<Item = (ObjectKey, &dyn Object)> + '_ {
        self.object_order
            .iter()
            .map(move |&key| (key, self.objects[key].as_ref()))
    }

    /// Move an object to `dest`, updating occupancy on both sites.
    ///
    /// The destination must be free (a self-move is permitted). Fails without
    /// touching any state otherwise; counters are advanced only on success.
    pub fn move_object(&mut self, key: ObjectKey, dest: Coord) -> Result<()> {
        let current = self.object(key)?.coords();
        if !self.lattice.contains(dest) {
            return Err(Error::InvalidArgument(format!(
                "move destination {dest} outside the lattice"
            )));
        }
        if dest != current && self.lattice.is_occupied(dest)? {
            return Err(Error::OccupancyViolation(format!(
                "move destination {dest} is occupied"
            )));
        }
        self.lattice.site_mut(current)?.clear_occupancy();
        self.lattice.site_mut(dest)?.set_occupied(key)?;
        self.objects[key].set_coords(dest);
        self.n_events_executed += 1;
        Ok(())
    }

    /// Remove an object: clear its site and erase both the object and its
    /// event slot. Handles held by domain code go stale; refreshing them is
    /// the domain's job (typically via a recalc pass).
    pub fn remove_object(&mut self, key: ObjectKey) -> Result<()> {
        let object = self
            .objects
            .get(key)
            .ok_or_else(move || Error::InvalidArgument("stale object handle".to_string()))?;
        let coords = object.coords();
        let event_key = object.event_key();
        self.lattice.site_mut(coords)?.clear_occupancy();
        self.objects.remove(key);
        self.object_order.retain(|&k| k != key);
        self.events.remove(event_key);
        self.event_order.retain(|&k| k != event_key);
        self.n_objects -= 1;
        self.n_events_executed += 1;
        Ok(())
    }

    /// Handles of every live object within the recalculation cutoff of
    /// `center`, in object-insertion order, using minimum-image distances
    /// across the enabled periodic axes.
    ///
    /// The physical cutoff is converted to lattice units through `unit_size`
    /// and compared in squared integer arithmetic.
    pub fn find_recalc_neighbors(&self, center: Coord) -> Result<Vec<ObjectKey>> {
        if !self.lattice.contains(center) {
            return Err(Error::InvalidArgument(format!(
                "recalc center {center} outside the lattice"
            )));
        }
        let cutoff_lat = self.recalc_cutoff / self.unit_size;
        let cutoff_sq = (cutoff_lat * cutoff_lat) as i64;
        let mut neighbors = Vec::new();
        for &key in &self.object_order {
            let coords = self.objects[key].coords();
            if self.lattice.min_image_distance_squared(center, coords) <= cutoff_sq {
                neighbors.push(key);
            }
        }
        Ok(neighbors)
    }

    /// Uniformly random lattice cell, drawn as three independent uniform
    /// integer samples from the engine stream.
    pub fn get_random_coords(&mut self) -> Coord {
        Coord::new(
            self.rng.random_range(0..self.lattice.length()),
            self.rng.random_range(0..self.lattice.width()),
            self.rng.random_range(0..self.lattice.height()),
        )
    }

    /// Uniform double in (0, 1] from the event stream, for domain sampling.
    #[inline]
    pub fn rand01(&mut self) -> f64 {
        self.event_rng.rand01()
    }

    /// Sample a first-reaction wait time for the given rate from the event
    /// stream.
    pub fn first_reaction_time(&mut self, rate: f64) -> Result<f64> {
        self.event_rng.first_reaction_time(rate)
    }

    /// The event RNG stream, for domain code that populates events before
    /// handing them to `set_event`.
    pub fn event_rng_mut(&mut self) -> &mut EventRng {
        &mut self.event_rng
    }

    /// Advance the simulation clock. `dt` must be finite and non-negative;
    /// time never decreases.
    pub fn increment_time(&mut self, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "time increment must be finite and >= 0, got {dt}"
            )));
        }
        self.time += dt;
        Ok(())
    }

    /// Append `msg` verbatim to the log sink when logging is enabled.
    /// A failed write surfaces as `Error::Io` and leaves the engine intact.
    pub fn log_msg(&mut self, msg: &str) -> Result<()> {
        if !self.enable_logging {
            return Ok(());
        }
        if let Some(sink) = self.logfile.as_mut() {
            sink.write_all(msg.as_bytes())?;
        }
        Ok(())
    }

    /// Whether the site at `coords` is occupied.
    pub fn is_occupied(&self, coords: Coord) -> Result<bool> {
        self.lattice.is_occupied(coords)
    }

    /// Checked access to the site at `coords`.
    pub fn site(&self, coords: Coord) -> Result<&Site> {
        self.lattice.site(coords)
    }

    #[inline]
    pub fn site_count(&self) -> usize {
        self.lattice.site_count()
    }

    #[inline]
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    #[inline]
    pub fn id(&self) -> i32 {
        self.id
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[inline]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    #[inline]
    pub fn unit_size(&self) -> f64 {
        self.unit_size
    }

    #[inline]
    pub fn logging_enabled(&self) -> bool {
        self.enable_logging
    }

    #[inline]
    pub fn recalc_enabled(&self) -> bool {
        self.enable_recalc
    }

    #[inline]
    pub fn recalc_cutoff(&self) -> f64 {
        self.recalc_cutoff
    }

    /// Number of live objects.
    #[inline]
    pub fn num_objects(&self) -> usize {
        self.n_objects
    }

    #[inline]
    pub fn n_objects_created(&self) -> u64 {
        self.n_objects_created
    }

    #[inline]
    pub fn n_events_executed(&self) -> u64 {
        self.n_events_executed
    }
}

/// Drop repeated handles from a caller-built list, keeping first occurrences.
pub fn remove_object_ref_duplicates(keys: &mut Vec<ObjectKey>) {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.retain(|&key| seen.insert(key));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::EventBase;
    use crate::core::object::ObjectBase;
    use slotmap::Key;
    use std::sync::{Arc, Mutex};

    struct Walker {
        base: ObjectBase,
    }

    impl Walker {
        fn boxed(id: u64, coords: Coord) -> Box<dyn Object> {
            Box::new(Self {
                base: ObjectBase::new(id, coords, 0.0),
            })
        }
    }

    impl Object for Walker {
        fn base(&self) -> &ObjectBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut ObjectBase {
            &mut self.base
        }
        fn name(&self) -> &'static str {
            "Walker"
        }
    }

    struct Hop {
        base: EventBase,
    }

    impl Hop {
        fn boxed(wait: f64, dest: Coord) -> Box<dyn Event> {
            let mut hop = Self {
                base: EventBase::default(),
            };
            hop.set_wait_time(wait).expect("finite wait");
            hop.set_dest_coords(dest);
            Box::new(hop)
        }
    }

    impl Event for Hop {
        fn base(&self) -> &EventBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut EventBase {
            &mut self.base
        }
        fn name(&self) -> &'static str {
            "Hop"
        }
        fn calculate_event(&mut self, dest: Coord, rate: f64, rng: &mut EventRng) -> Result<()> {
            self.set_dest_coords(dest);
            let t = rng.first_reaction_time(rate)?;
            self.set_wait_time(t)
        }
    }

    fn small_params() -> Parameters {
        Parameters {
            length: 10,
            width: 10,
            height: 10,
            ..Parameters::default()
        }
    }

    fn small_sim() -> Result<Simulation> {
        Simulation::new_at(small_params(), 0, 1)
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("sink lock").extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn construction_validates_parameters() {
        assert!(Simulation::new_at(small_params(), -1, 1).is_err());
        let mut p = small_params();
        p.unit_size = 0.0;
        assert!(Simulation::new_at(p, 0, 1).is_err());
        let mut p = small_params();
        p.length = 0;
        assert!(Simulation::new_at(p, 0, 1).is_err());
        let mut p = small_params();
        p.recalc_cutoff = -1.0;
        assert!(Simulation::new_at(p, 0, 1).is_err());
    }

    #[test]
    fn add_object_allocates_slot_and_bumps_counters() -> Result<()> {
        let mut sim = small_sim()?;
        let key = sim.add_object(Walker::boxed(1, Coord::new(2, 3, 4)))?;

        assert!(sim.is_occupied(Coord::new(2, 3, 4))?);
        assert_eq!(sim.site(Coord::new(2, 3, 4))?.occupant(), Some(key));
        assert_eq!(sim.num_objects(), 1);
        assert_eq!(sim.n_objects_created(), 1);
        assert_eq!(sim.n_events_executed(), 1);

        let slot = sim.object(key)?.event_key();
        assert!(!slot.is_null());
        // Placeholder until the domain fills it in.
        assert!(sim.event(slot).is_err());
        assert!(matches!(
            sim.choose_next_event(),
            Err(Error::EmptyEventSet)
        ));
        Ok(())
    }

    #[test]
    fn add_object_rejects_occupied_site_without_side_effects() -> Result<()> {
        let mut sim = small_sim()?;
        sim.add_object(Walker::boxed(1, Coord::new(5, 5, 5)))?;
        let err = sim
            .add_object(Walker::boxed(2, Coord::new(5, 5, 5)))
            .unwrap_err();
        assert!(matches!(err, Error::OccupancyViolation(_)));
        assert_eq!(sim.num_objects(), 1);
        assert_eq!(sim.n_objects_created(), 1);
        assert_eq!(sim.n_events_executed(), 1);
        Ok(())
    }

    #[test]
    fn set_event_fills_and_refills_a_slot() -> Result<()> {
        let mut sim = small_sim()?;
        let key = sim.add_object(Walker::boxed(1, Coord::new(0, 0, 0)))?;
        let slot = sim.object(key)?.event_key();

        sim.set_event(slot, Hop::boxed(4.0, Coord::new(1, 0, 0)))?;
        assert_eq!(sim.event(slot)?.wait_time(), 4.0);

        // Refill drops the previous event.
        sim.set_event(slot, Hop::boxed(0.5, Coord::new(0, 1, 0)))?;
        assert_eq!(sim.event(slot)?.wait_time(), 0.5);
        assert_eq!(sim.event(slot)?.dest_coords(), Coord::new(0, 1, 0));
        Ok(())
    }

    #[test]
    fn choose_next_event_picks_minimum_and_breaks_ties_by_insertion() -> Result<()> {
        let mut sim = small_sim()?;
        let a = sim.add_event(Hop::boxed(3.0, Coord::default()));
        let b = sim.add_event(Hop::boxed(1.0, Coord::default()));
        let c = sim.add_event(Hop::boxed(1.0, Coord::default()));
        let _ = c;
        assert_eq!(sim.choose_next_event()?, b);

        // Lowering the first slot to the same wait time makes it win the tie.
        sim.set_event(a, Hop::boxed(1.0, Coord::default()))?;
        assert_eq!(sim.choose_next_event()?, a);
        Ok(())
    }

    #[test]
    fn calculate_event_routes_through_engine_rng() -> Result<()> {
        let mut sim = small_sim()?;
        let key = sim.add_object(Walker::boxed(1, Coord::new(0, 0, 0)))?;
        let slot = sim.object(key)?.event_key();
        sim.set_event(slot, Hop::boxed(0.0, Coord::default()))?;
        sim.calculate_event(slot, Coord::new(1, 0, 0), 5.0)?;
        assert!(sim.event(slot)?.wait_time() > 0.0);
        assert_eq!(sim.event(slot)?.dest_coords(), Coord::new(1, 0, 0));
        Ok(())
    }

    #[test]
    fn move_object_updates_occupancy_atomically() -> Result<()> {
        let mut sim = small_sim()?;
        let key = sim.add_object(Walker::boxed(1, Coord::new(0, 0, 0)))?;
        let other = sim.add_object(Walker::boxed(2, Coord::new(1, 0, 0)))?;
        let _ = other;
        let executed = sim.n_events_executed();

        // Moving onto an occupied site fails and changes nothing.
        let err = sim.move_object(key, Coord::new(1, 0, 0)).unwrap_err();
        assert!(matches!(err, Error::OccupancyViolation(_)));
        assert_eq!(sim.object(key)?.coords(), Coord::new(0, 0, 0));
        assert!(sim.is_occupied(Coord::new(0, 0, 0))?);
        assert_eq!(sim.n_events_executed(), executed);

        sim.move_object(key, Coord::new(0, 5, 0))?;
        assert_eq!(sim.object(key)?.coords(), Coord::new(0, 5, 0));
        assert!(!sim.is_occupied(Coord::new(0, 0, 0))?);
        assert!(sim.is_occupied(Coord::new(0, 5, 0))?);
        assert_eq!(sim.n_events_executed(), executed + 1);
        Ok(())
    }

    #[test]
    fn remove_object_clears_site_and_slot() -> Result<()> {
        let mut sim = small_sim()?;
        let key = sim.add_object(Walker::boxed(1, Coord::new(3, 3, 3)))?;
        let slot = sim.object(key)?.event_key();
        sim.set_event(slot, Hop::boxed(1.0, Coord::default()))?;

        sim.remove_object(key)?;
        assert_eq!(sim.num_objects(), 0);
        assert_eq!(sim.n_objects_created(), 1);
        assert!(!sim.is_occupied(Coord::new(3, 3, 3))?);
        assert!(sim.object(key).is_err());
        assert!(sim.event(slot).is_err());
        assert!(matches!(sim.choose_next_event(), Err(Error::EmptyEventSet)));
        // Removing again is an error on the stale handle.
        assert!(sim.remove_object(key).is_err());
        Ok(())
    }

    #[test]
    fn random_coords_are_in_range_and_reproducible() -> Result<()> {
        let mut a = Simulation::new_at(small_params(), 3, 42)?;
        let mut b = Simulation::new_at(small_params(), 3, 42)?;
        for _ in 0..200 {
            let c = a.get_random_coords();
            assert!(a.lattice().contains(c));
            assert_eq!(c, b.get_random_coords());
        }
        Ok(())
    }

    #[test]
    fn increment_time_is_monotonic_and_checked() -> Result<()> {
        let mut sim = small_sim()?;
        sim.increment_time(1.5)?;
        sim.increment_time(0.0)?;
        sim.increment_time(2.5)?;
        assert_eq!(sim.time(), 4.0);
        assert!(sim.increment_time(-0.1).is_err());
        assert!(sim.increment_time(f64::NAN).is_err());
        assert_eq!(sim.time(), 4.0);
        Ok(())
    }

    #[test]
    fn dedup_preserves_first_occurrence() -> Result<()> {
        let mut sim = small_sim()?;
        let a = sim.add_object(Walker::boxed(1, Coord::new(0, 0, 0)))?;
        let b = sim.add_object(Walker::boxed(2, Coord::new(1, 0, 0)))?;
        let mut keys = vec![a, b, a, a, b];
        remove_object_ref_duplicates(&mut keys);
        assert_eq!(keys, vec![a, b]);
        Ok(())
    }

    #[test]
    fn log_msg_writes_verbatim_only_when_enabled() -> Result<()> {
        let sink = SharedBuf::default();
        let mut params = small_params();
        params.enable_logging = true;
        params.logfile = Some(Box::new(sink.clone()));
        let mut sim = Simulation::new_at(params, 0, 1)?;
        sim.log_msg("hop accepted\n")?;
        sim.log_msg("hop rejected\n")?;
        assert_eq!(
            String::from_utf8(sink.0.lock().expect("sink lock").clone()).expect("utf8"),
            "hop accepted\nhop rejected\n"
        );

        let silent = SharedBuf::default();
        let mut params = small_params();
        params.logfile = Some(Box::new(silent.clone()));
        let mut sim = Simulation::new_at(params, 0, 1)?;
        sim.log_msg("dropped\n")?;
        assert!(silent.0.lock().expect("sink lock").is_empty());
        Ok(())
    }
}
