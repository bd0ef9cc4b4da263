//! # Disk Image Module
//!
//! Storage for the Jasmin file system.  A Jasmin disk is a plain array of 256 byte sectors,
//! 17 to a track, with either 41 or 82 tracks.  The only container is the raw sector dump in
//! `dsk`, but the file system reaches it through the `DiskImage` trait so it never deals
//! with byte offsets or sides.
//!
//! Sectors can be addressed two ways:
//! * `fs::Block`, where the track runs over both sides (`track = cylinder + head*41`)
//! * physical cylinder, head, and sector, as the controller sees it
//!
//! Geometries are described by `DiskKind`.  Constants for the two Jasmin disks are in `names`.

pub mod dsk;
pub mod names;

use std::str::FromStr;
use std::fmt;
use a2kit_macro::DiskStructError;
use crate::fs;
use crate::{STDRESULT,DYNERR};

/// Errors from the image layer, mostly addresses that are off the disk
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("unknown kind of disk")]
    UnknownDiskKind,
    #[error("geometric coordinate out of range")]
    GeometryMismatch,
    #[error("unable to access sector")]
    SectorAccess
}

/// Cylinders, sides, sectors per track, and sector size.  Jasmin tracks all have the same layout.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub struct TrackLayout {
    cylinders: usize,
    sides: usize,
    sectors: usize,
    sector_size: usize
}

/// Disk package and layout, `D3` is the 3 inch disk the Jasmin drive takes
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum DiskKind {
    Unknown,
    D3(TrackLayout)
}

impl TrackLayout {
    pub fn cylinders(&self) -> usize {
        self.cylinders
    }
    pub fn sides(&self) -> usize {
        self.sides
    }
    pub fn sectors(&self) -> usize {
        self.sectors
    }
    pub fn sector_size(&self) -> usize {
        self.sector_size
    }
    pub fn track_count(&self) -> usize {
        self.cylinders * self.sides
    }
    pub fn byte_capacity(&self) -> usize {
        self.track_count() * self.sectors * self.sector_size
    }
}

/// Prints as `cylinders/sides/sectors/size`, e.g. `41/1/17/256`
impl fmt::Display for TrackLayout {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{}/{}/{}/{}",self.cylinders,self.sides,self.sectors,self.sector_size)
    }
}

impl fmt::Display for DiskKind {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            names::ORIC_JASMIN_SS_KIND => write!(f,"Oric Jasmin 3 inch single sided"),
            names::ORIC_JASMIN_DS_KIND => write!(f,"Oric Jasmin 3 inch double sided"),
            DiskKind::D3(lay) => write!(f,"3.0 inch {}",lay),
            DiskKind::Unknown => write!(f,"unknown")
        }
    }
}

/// Accepts `3in-jasmin-ss` or `3in-jasmin-ds`
impl FromStr for DiskKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "3in-jasmin-ss" => Ok(names::ORIC_JASMIN_SS_KIND),
            "3in-jasmin-ds" => Ok(names::ORIC_JASMIN_DS_KIND),
            _ => Err(Error::UnknownDiskKind)
        }
    }
}

/// Sector storage owned by a `DiskFS`.  Requests off the disk are refused with `Error`.
pub trait DiskImage {
    /// Tracks on both sides together
    fn track_count(&self) -> usize;
    fn byte_capacity(&self) -> usize;
    fn file_extensions(&self) -> Vec<String>;
    fn kind(&self) -> DiskKind;
    fn from_bytes(buf: &[u8]) -> Result<Self,DiskStructError> where Self: Sized;
    fn to_bytes(&mut self) -> Vec<u8>;
    fn read_block(&mut self,addr: fs::Block) -> Result<Vec<u8>,DYNERR>;
    /// Short data is padded with zeros, long data is cut off at the sector size
    fn write_block(&mut self,addr: fs::Block,dat: &[u8]) -> STDRESULT;
    /// Sectors are numbered from 1 on each side
    fn read_sector(&mut self,cyl: usize,head: usize,sec: usize) -> Result<Vec<u8>,DYNERR>;
    fn write_sector(&mut self,cyl: usize,head: usize,sec: usize,dat: &[u8]) -> STDRESULT;
}

/// Fit `src` to exactly one sector of `quantum` bytes
pub fn quantize_block(src: &[u8],quantum: usize) -> Vec<u8> {
    let mut padded = vec![0;quantum];
    let end = usize::min(src.len(),quantum);
    padded[0..end].copy_from_slice(&src[0..end]);
    return padded;
}

#[test]
fn test_quantize() {
    assert_eq!(quantize_block(&[1,2,3],5),vec![1,2,3,0,0]);
    assert_eq!(quantize_block(&[1,2,3,4,5,6],4),vec![1,2,3,4]);
}

#[test]
fn test_kind_strings() {
    assert_eq!(DiskKind::from_str("3in-jasmin-ds").unwrap(),names::ORIC_JASMIN_DS_KIND);
    assert_eq!(names::ORIC_JASMIN_SS_KIND.to_string(),"Oric Jasmin 3 inch single sided");
    assert_eq!(names::ORIC_JASMIN_SS.to_string(),"41/1/17/256");
    assert!(DiskKind::from_str("5.25in-apple-16").is_err());
}
