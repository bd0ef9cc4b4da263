//! # File System Module
//!
//! File system modules handle interactions with directories and files.  There is a sub-module for
//! each supported file system, at present only `jasmin`.
//!
//! File systems are represented by the `DiskFS` trait.  The trait object takes ownership of
//! some disk image, which it uses as storage.  The root directory is reached with `DiskFS::root`,
//! which hands out a shared `Directory` trait object.  Files are reached through the directory
//! as `FileNode` trait objects.  All of these exchange metadata through the property bag in `meta`.
//!
//! This module also contains the `Block` enumeration, which specifies and locates allocation units.
//! Transformation of a `Block` to a physical disk address is handled within the `img` module.

pub mod meta;
pub mod jasmin;

use std::fmt;
use std::rc::Rc;
use crate::{STDRESULT,DYNERR};
pub use meta::{MetaData,MetaDescription,MetaName,MetaValue};

/// Enumerates file system errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("file system not compatible with request")]
    FileSystemMismatch
}

/// Encapsulates the disk address and addressing mode used by a file system.
/// The disk image layer has the final responsibility for mapping this to a physical sector.
#[derive(PartialEq,Eq,Clone,Copy,Hash,Debug)]
pub enum Block {
    /// value is [track,sector], sectors are numbered from 1, tracks run over both sides
    TS([usize;2]),
    /// value is the flat block index
    LBA(usize)
}

impl Block {
    /// Track and sector of this block given the sectors per track
    pub fn ts(&self,secs_per_track: usize) -> [usize;2] {
        match self {
            Self::TS(ts) => *ts,
            Self::LBA(b) => [b/secs_per_track,b%secs_per_track+1]
        }
    }
    /// Flat block index given the sectors per track, sector 0 is treated as sector 1
    pub fn lba(&self,secs_per_track: usize) -> usize {
        match self {
            Self::TS([t,s]) => t*secs_per_track + s.saturating_sub(1),
            Self::LBA(b) => *b
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TS([t,s]) => write!(f,"track {} sector {}",t,s),
            Self::LBA(b) => write!(f,"block {}",b)
        }
    }
}

/// Distinguishes regular files from pseudo-files that map a fixed disk region
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum EntryType {
    File,
    SystemFile
}

/// One line of a directory listing
#[derive(PartialEq,Eq,Clone,Debug)]
pub struct DirEntry {
    pub name: String,
    pub typ: EntryType,
    /// key that will retrieve the file from its directory
    pub key: u64
}

/// Abstract directory handle.  The root directory is shared, so all methods take `&self`.
pub trait Directory {
    fn metadata(&self) -> MetaData;
    fn metadata_change(&self,meta: &MetaData) -> STDRESULT;
    /// List entries in the order they appear on disk
    fn contents(&self) -> Result<Vec<DirEntry>,DYNERR>;
    fn file_get(&self,key: u64) -> Result<Box<dyn FileNode>,DYNERR>;
    fn dir_get(&self,key: u64) -> Result<Rc<dyn Directory>,DYNERR>;
    fn file_create(&self,meta: &MetaData) -> Result<Box<dyn FileNode>,DYNERR>;
    fn file_delete(&self,key: u64) -> STDRESULT;
}

/// Abstract file handle, the handle keeps a copy of the directory record
pub trait FileNode {
    fn key(&self) -> u64;
    fn is_system(&self) -> bool;
    fn metadata(&self) -> Result<MetaData,DYNERR>;
    fn metadata_change(&mut self,meta: &MetaData) -> STDRESULT;
    /// Read the whole file, the result is exactly the recorded length
    fn read_all(&self) -> Result<Vec<u8>,DYNERR>;
    /// Replace the whole file
    fn replace(&mut self,dat: &[u8]) -> STDRESULT;
}

/// Abstract file system interface.  Presumed to own an underlying DiskImage.
pub trait DiskFS {
    /// Describe the volume level metadata, with defaults and validators
    fn volume_meta_description(&self) -> Vec<MetaDescription>;
    /// Describe the file level metadata, with defaults and validators
    fn file_meta_description(&self) -> Vec<MetaDescription>;
    /// Write an empty file system, the only metadata used is the volume name
    fn format(&mut self,meta: &MetaData) -> STDRESULT;
    fn metadata(&mut self) -> Result<MetaData,DYNERR>;
    fn metadata_change(&mut self,meta: &MetaData) -> STDRESULT;
    /// Get the root directory, the same object is returned as long as someone holds it
    fn root(&mut self) -> Rc<dyn Directory>;
    fn num_free_blocks(&mut self) -> Result<usize,DYNERR>;
    /// Get the underlying image as bytes, e.g., for saving
    fn to_img_bytes(&mut self) -> Vec<u8>;
}

#[test]
fn test_block() {
    assert_eq!(Block::LBA(340).ts(17),[20,1]);
    assert_eq!(Block::TS([20,2]).lba(17),341);
    assert_eq!(Block::TS([3,4]).ts(17),[3,4]);
    assert_eq!(Block::LBA(16).to_string(),"block 16");
    assert_eq!(Block::TS([1,17]).to_string(),"track 1 sector 17");
}
