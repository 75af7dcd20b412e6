use crate::core::site::Site;
use crate::error::{Error, Result};

/// Integer coordinates naming one lattice cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    /// Create a coordinate triple.
    #[inline]
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Adjustment to add to `pos + step` so the result lands inside `[0, extent)`
/// on a periodic axis. Non-periodic axes never adjust; the caller is
/// responsible for rejecting out-of-range results there.
#[inline]
pub fn wrap_delta_axis(pos: i32, step: i32, extent: i32, periodic: bool) -> i32 {
    if !periodic {
        return 0;
    }
    if pos + step < 0 {
        extent
    } else if pos + step >= extent {
        -extent
    } else {
        0
    }
}

/// Adjustment applied to `|delta|` so the sum is the minimum-image separation
/// on a periodic axis: `-extent` when `|delta| > extent / 2`, else 0.
#[inline]
pub fn min_image_delta_axis(delta: i32, extent: i32, periodic: bool) -> i32 {
    if periodic && delta.abs() > extent / 2 {
        -extent
    } else {
        0
    }
}

/// Dense 3D site grid with optional periodic wrap on each axis.
///
/// Sites are stored contiguously and addressed by
/// `site_index(c) = x * W * H + y * H + z`. All site access is checked:
/// out-of-range coordinates yield `Error::InvalidArgument`.
pub struct Lattice {
    length: i32,
    width: i32,
    height: i32,
    periodic_x: bool,
    periodic_y: bool,
    periodic_z: bool,
    sites: Vec<Site>,
}

impl Lattice {
    /// Build a lattice of `length * width * height` unoccupied sites.
    ///
    /// Errors with `InvalidArgument` if any extent is non-positive or the
    /// site count does not fit in memory addressing.
    pub fn new(
        length: i32,
        width: i32,
        height: i32,
        periodic_x: bool,
        periodic_y: bool,
        periodic_z: bool,
    ) -> Result<Self> {
        if length <= 0 || width <= 0 || height <= 0 {
            return Err(Error::InvalidArgument(format!(
                "lattice extents must be > 0, got {length} x {width} x {height}"
            )));
        }
        let count = (length as i64) * (width as i64) * (height as i64);
        let count = usize::try_from(count).map_err(|_| {
            Error::InvalidArgument(format!("lattice site count {count} is not addressable"))
        })?;
        let mut sites = Vec::new();
        sites
            .try_reserve_exact(count)
            .map_err(|_| Error::AllocationFailure(format!("cannot allocate {count} sites")))?;
        sites.resize_with(count, Site::default);
        Ok(Self {
            length,
            width,
            height,
            periodic_x,
            periodic_y,
            periodic_z,
            sites,
        })
    }

    /// Lattice extent along x.
    #[inline]
    pub fn length(&self) -> i32 {
        self.length
    }

    /// Lattice extent along y.
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Lattice extent along z.
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Total number of sites, `L * W * H`.
    #[inline]
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    #[inline]
    pub fn periodic_x(&self) -> bool {
        self.periodic_x
    }

    #[inline]
    pub fn periodic_y(&self) -> bool {
        self.periodic_y
    }

    #[inline]
    pub fn periodic_z(&self) -> bool {
        self.periodic_z
    }

    /// Whether `c` lies inside `[0, L) x [0, W) x [0, H)`.
    #[inline]
    pub fn contains(&self, c: Coord) -> bool {
        c.x >= 0
            && c.x < self.length
            && c.y >= 0
            && c.y < self.width
            && c.z >= 0
            && c.z < self.height
    }

    /// Flat index of a valid coordinate. Callers must check `contains` first;
    /// checked access goes through `site` / `site_mut`.
    #[inline]
    pub fn site_index(&self, c: Coord) -> usize {
        debug_assert!(self.contains(c), "site_index on out-of-range coord {c}");
        (c.x as usize) * (self.width as usize) * (self.height as usize)
            + (c.y as usize) * (self.height as usize)
            + (c.z as usize)
    }

    /// Checked shared access to the site at `c`.
    pub fn site(&self, c: Coord) -> Result<&Site> {
        if !self.contains(c) {
            return Err(Error::InvalidArgument(format!(
                "coordinates {c} outside lattice {} x {} x {}",
                self.length, self.width, self.height
            )));
        }
        let idx = self.site_index(c);
        Ok(&self.sites[idx])
    }

    /// Checked mutable access to the site at `c`.
    pub fn site_mut(&mut self, c: Coord) -> Result<&mut Site> {
        if !self.contains(c) {
            return Err(Error::InvalidArgument(format!(
                "coordinates {c} outside lattice {} x {} x {}",
                self.length, self.width, self.height
            )));
        }
        let idx = self.site_index(c);
        Ok(&mut self.sites[idx])
    }

    /// Whether the site at `c` is occupied.
    pub fn is_occupied(&self, c: Coord) -> Result<bool> {
        Ok(self.site(c)?.is_occupied())
    }

    /// Coordinates reached from `c` by the step `(dx, dy, dz)`, wrapped on
    /// periodic axes. A step that leaves the lattice on a non-periodic axis
    /// (or overshoots a full extent on a periodic one) is `InvalidArgument`.
    pub fn destination_coords(&self, c: Coord, dx: i32, dy: i32, dz: i32) -> Result<Coord> {
        let dest = Coord::new(
            c.x + dx + wrap_delta_axis(c.x, dx, self.length, self.periodic_x),
            c.y + dy + wrap_delta_axis(c.y, dy, self.width, self.periodic_y),
            c.z + dz + wrap_delta_axis(c.z, dz, self.height, self.periodic_z),
        );
        if !self.contains(dest) {
            return Err(Error::InvalidArgument(format!(
                "step ({dx}, {dy}, {dz}) from {c} leaves the lattice"
            )));
        }
        Ok(dest)
    }

    /// Squared lattice distance between `a` and `b` under the minimum-image
    /// convention across the enabled periodic axes.
    pub fn min_image_distance_squared(&self, a: Coord, b: Coord) -> i64 {
        let dx = (b.x - a.x).abs() + min_image_delta_axis(b.x - a.x, self.length, self.periodic_x);
        let dy = (b.y - a.y).abs() + min_image_delta_axis(b.y - a.y, self.width, self.periodic_y);
        let dz = (b.z - a.z).abs() + min_image_delta_axis(b.z - a.z, self.height, self.periodic_z);
        let (dx, dy, dz) = (dx as i64, dy as i64, dz as i64);
        dx * dx + dy * dy + dz * dz
    }
}
