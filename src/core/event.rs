use crate::core::lattice::Coord;
use crate::core::object::ObjectKey;
use crate::error::{Error, Result};
use ordered_float::NotNan;
use rand::{rngs::StdRng, Rng, SeedableRng};
use slotmap::new_key_type;

new_key_type! {
    /// Generational handle to a pending-event slot owned by the engine.
    pub struct EventKey;
}

/// Deterministic stream used by domain code to sample event wait times.
///
/// All event randomness must route through this stream so that a seeded
/// simulation reproduces its trajectory exactly.
#[derive(Debug)]
pub struct EventRng {
    rng: StdRng,
}

impl EventRng {
    /// Create a stream from a deterministic seed.
    pub fn seed_from(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform double in (0, 1].
    #[inline]
    pub fn rand01(&mut self) -> f64 {
        1.0 - self.rng.random::<f64>()
    }

    /// Sample a first-reaction wait time `-ln(u) / rate` for a process with
    /// the given physical rate.
    ///
    /// Errors with `InvalidArgument` unless `rate` is finite and positive.
    pub fn first_reaction_time(&mut self, rate: f64) -> Result<f64> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "event rate must be finite and > 0, got {rate}"
            )));
        }
        Ok(-self.rand01().ln() / rate)
    }
}

/// Common state embedded by every concrete event kind.
///
/// Wait times are stored NaN-free so the engine's minimum scan is a total
/// order.
#[derive(Debug, Clone)]
pub struct EventBase {
    wait_time: NotNan<f64>,
    dest_coords: Coord,
    object: ObjectKey,
    target: Option<ObjectKey>,
}

impl Default for EventBase {
    fn default() -> Self {
        Self {
            wait_time: NotNan::new(0.0).expect("0.0 is not NaN"),
            dest_coords: Coord::default(),
            object: ObjectKey::default(),
            target: None,
        }
    }
}

/// A pending stochastic event.
///
/// Concrete kinds embed an [`EventBase`] and supply `calculate_event`, which
/// populates the destination and wait time from the physical rate using the
/// engine-owned [`EventRng`]. The engine treats every event uniformly when
/// selecting the next one to fire.
pub trait Event {
    /// Shared event state.
    fn base(&self) -> &EventBase;

    /// Mutable shared event state.
    fn base_mut(&mut self) -> &mut EventBase;

    /// Kind name of the concrete event.
    fn name(&self) -> &'static str {
        "Event"
    }

    /// Domain hook: compute the destination and sampled wait time for this
    /// event given the proposed destination and physical rate.
    fn calculate_event(&mut self, dest: Coord, rate: f64, rng: &mut EventRng) -> Result<()>;

    /// Lattice cell at which the event will act.
    fn dest_coords(&self) -> Coord {
        self.base().dest_coords
    }

    fn set_dest_coords(&mut self, coords: Coord) {
        self.base_mut().dest_coords = coords;
    }

    /// Sampled firing time; the engine selects the pending event with the
    /// minimum value.
    fn wait_time(&self) -> f64 {
        self.base().wait_time.into_inner()
    }

    /// Set the sampled firing time.
    ///
    /// Errors with `InvalidArgument` if `time` is NaN or infinite.
    fn set_wait_time(&mut self, time: f64) -> Result<()> {
        if !time.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "wait time must be finite, got {time}"
            )));
        }
        self.base_mut().wait_time = NotNan::new(time)
            .map_err(|_| Error::InvalidArgument("wait time cannot be NaN".to_string()))?;
        Ok(())
    }

    /// Handle of the acting object.
    fn object_key(&self) -> ObjectKey {
        self.base().object
    }

    fn set_object_key(&mut self, key: ObjectKey) {
        self.base_mut().object = key;
    }

    /// Handle of the target object, when the event acts on a second object.
    fn target_key(&self) -> Option<ObjectKey> {
        self.base().target
    }

    fn set_target_key(&mut self, key: Option<ObjectKey>) {
        self.base_mut().target = key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Hop {
        base: EventBase,
    }

    impl Hop {
        fn new() -> Self {
            Self {
                base: EventBase::default(),
            }
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

    #[test]
    fn default_base_state() {
        let hop = Hop::new();
        assert_eq!(hop.wait_time(), 0.0);
        assert_eq!(hop.dest_coords(), Coord::default());
        assert_eq!(hop.target_key(), None);
        assert_eq!(hop.name(), "Hop");
    }

    #[test]
    fn set_wait_time_rejects_nan_and_infinite() {
        let mut hop = Hop::new();
        assert!(hop.set_wait_time(f64::NAN).is_err());
        assert!(hop.set_wait_time(f64::INFINITY).is_err());
        assert!(hop.set_wait_time(2.5).is_ok());
        assert_eq!(hop.wait_time(), 2.5);
    }

    #[test]
    fn rand01_stays_in_half_open_unit_interval() {
        let mut rng = EventRng::seed_from(42);
        for _ in 0..10_000 {
            let u = rng.rand01();
            assert!(u > 0.0 && u <= 1.0, "rand01 produced {u}");
        }
    }

    #[test]
    fn seeded_streams_are_reproducible() {
        let mut a = EventRng::seed_from(99);
        let mut b = EventRng::seed_from(99);
        for _ in 0..100 {
            assert_eq!(a.rand01(), b.rand01());
        }
    }

    #[test]
    fn first_reaction_time_is_positive_and_rate_checked() -> Result<()> {
        let mut rng = EventRng::seed_from(7);
        for _ in 0..1000 {
            let t = rng.first_reaction_time(2.0)?;
            assert!(t > 0.0 && t.is_finite());
        }
        assert!(rng.first_reaction_time(0.0).is_err());
        assert!(rng.first_reaction_time(-1.0).is_err());
        assert!(rng.first_reaction_time(f64::NAN).is_err());
        Ok(())
    }

    #[test]
    fn calculate_event_populates_dest_and_wait() -> Result<()> {
        let mut rng = EventRng::seed_from(5);
        let mut hop = Hop::new();
        hop.calculate_event(Coord::new(1, 0, 0), 10.0, &mut rng)?;
        assert_eq!(hop.dest_coords(), Coord::new(1, 0, 0));
        assert!(hop.wait_time() > 0.0);
        Ok(())
    }
}
