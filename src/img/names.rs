//! ## Disk Names
//!
//! Collection of handy names for the disk kinds and track layouts.
//! These are mainly for pattern matching.
//!
//! A disk kind comprises both mechanical and magnetic properties of
//! a disk.  It should not be confused with a file system.

use super::{DiskKind,TrackLayout};

/// Jasmin single sided, 41 tracks of 17 sectors, 178432 bytes
pub const ORIC_JASMIN_SS: TrackLayout = TrackLayout {
    cylinders: 41,
    sides: 1,
    sectors: 17,
    sector_size: 256
};

/// Jasmin double sided, 82 tracks of 17 sectors, 356864 bytes
pub const ORIC_JASMIN_DS: TrackLayout = TrackLayout {
    cylinders: 41,
    sides: 2,
    sectors: 17,
    sector_size: 256
};

pub const ORIC_JASMIN_SS_KIND: DiskKind = DiskKind::D3(ORIC_JASMIN_SS);
pub const ORIC_JASMIN_DS_KIND: DiskKind = DiskKind::D3(ORIC_JASMIN_DS);
