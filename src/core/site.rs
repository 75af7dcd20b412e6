use crate::core::object::ObjectKey;
use crate::error::{Error, Result};

/// One cell of the lattice.
///
/// A site records whether it is occupied and, when it is, a non-owning handle
/// to the resident object. The handle goes stale when the object is removed
/// from the engine; the engine keeps both sides consistent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Site {
    occupant: Option<ObjectKey>,
}

impl Site {
    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    /// Handle of the resident object, if any.
    #[inline]
    pub fn occupant(&self) -> Option<ObjectKey> {
        self.occupant
    }

    /// Mark the site occupied by `object`.
    ///
    /// Errors with `OccupancyViolation` if the site is already occupied.
    pub fn set_occupied(&mut self, object: ObjectKey) -> Result<()> {
        if self.occupant.is_some() {
            return Err(Error::OccupancyViolation(
                "site is already occupied".to_string(),
            ));
        }
        self.occupant = Some(object);
        Ok(())
    }

    /// Clear the occupancy flag. A no-op on an unoccupied site.
    #[inline]
    pub fn clear_occupancy(&mut self) {
        self.occupant = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn occupancy_round_trip() -> Result<()> {
        let mut keys: SlotMap<ObjectKey, ()> = SlotMap::with_key();
        let k = keys.insert(());

        let mut site = Site::default();
        assert!(!site.is_occupied());
        assert_eq!(site.occupant(), None);

        site.set_occupied(k)?;
        assert!(site.is_occupied());
        assert_eq!(site.occupant(), Some(k));

        site.clear_occupancy();
        assert!(!site.is_occupied());
        Ok(())
    }

    #[test]
    fn double_occupancy_is_rejected() -> Result<()> {
        let mut keys: SlotMap<ObjectKey, ()> = SlotMap::with_key();
        let a = keys.insert(());
        let b = keys.insert(());

        let mut site = Site::default();
        site.set_occupied(a)?;
        let err = site.set_occupied(b).unwrap_err();
        assert!(err.to_string().contains("occupancy violation"));
        // The original occupant is untouched by the failed call.
        assert_eq!(site.occupant(), Some(a));
        Ok(())
    }

    #[test]
    fn clearing_an_empty_site_is_a_noop() {
        let mut site = Site::default();
        site.clear_occupancy();
        assert!(!site.is_occupied());
    }
}
