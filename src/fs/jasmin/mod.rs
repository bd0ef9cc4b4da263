//! # Jasmin file system module
//!
//! This manipulates disk images containing the Oric Jasmin file system.
//!
//! * Single directory that grows as a chain of sectors, 14 files per sector
//! * Free space is a bitmap in the volume header at track 20 sector 1
//! * Each file is a chain of index sectors listing data sectors
//! * Blocks 0-61 hold the DOS image, which appears as `SYSTEM.SYS` under key 0
//!
//! The `Disk` owns the image.  The root directory and file handles share it.
//! As long as a root handle is alive, `DiskFS::root` returns that same handle.
//! Behavior for irregular requests is selected with `Mode` when the disk is mounted.

pub mod types;
mod directory;
mod volume;
mod bitmap;
mod catalog;
mod chain;
mod root;

use std::cell::RefCell;
use std::rc::{Rc,Weak};
use a2kit_macro::DiskStruct;
use log::{debug,error};
use types::*;
use directory::VolumeHeader;
use volume::Volume;
use root::RootDir;
use crate::img;
use crate::fs::{Block,Directory,DiskFS,MetaData,MetaDescription,MetaName,MetaValue};
use crate::{STDRESULT,DYNERR};

pub use types::Mode;

fn file_name_ok(v: &MetaValue) -> bool {
    v.as_string().map_or(false,validate_filename)
}

fn address_ok(v: &MetaValue) -> bool {
    v.as_number().map_or(false,|n| n < 0x10000)
}

fn label_ok(v: &MetaValue) -> bool {
    v.as_string().map_or(false,validate_volume_name)
}

/// Metadata a Jasmin file understands, with defaults
pub fn file_meta_description() -> Vec<MetaDescription> {
    vec![
        MetaDescription::new(MetaName::Name,MetaValue::from(""),false,Some(file_name_ok),"up to 8 characters, optional extension of up to 3"),
        MetaDescription::new(MetaName::LoadingAddress,MetaValue::from(DEFAULT_LOAD_ADDRESS),false,Some(address_ok),"where the file loads in memory"),
        MetaDescription::new(MetaName::Length,MetaValue::from(0u64),true,None,"length in bytes"),
        MetaDescription::new(MetaName::SizeInBlocks,MetaValue::from(0u64),true,None,"sectors used, including index sectors"),
        MetaDescription::new(MetaName::Locked,MetaValue::from(false),false,None,"write protect"),
        MetaDescription::new(MetaName::Sequential,MetaValue::from(true),false,None,"sequential or direct access")
    ]
}

/// Metadata a Jasmin volume understands, with defaults
pub fn volume_meta_description() -> Vec<MetaDescription> {
    vec![
        MetaDescription::new(MetaName::Name,MetaValue::from(DEFAULT_LABEL),false,Some(label_ok),"up to 8 characters")
    ]
}

/// The primary interface for disk operations.
pub struct Disk {
    vol: Rc<RefCell<Volume>>,
    root: Rc<RefCell<Option<Weak<RootDir>>>>
}

impl Disk {
    /// Create a disk file system using the given image as storage.
    /// The DiskFS takes ownership of the image.
    pub fn from_img(img: Box<dyn img::DiskImage>,mode: Mode) -> Self {
        Self {
            vol: Rc::new(RefCell::new(Volume::new(img,mode))),
            root: Rc::new(RefCell::new(None))
        }
    }
    /// Test an image for the Jasmin file system.
    pub fn test_img(img: &mut Box<dyn img::DiskImage>) -> bool {
        let layout = match img.kind() {
            img::DiskKind::D3(layout) => layout,
            _ => {
                debug!("not a 3 inch disk");
                return false;
            }
        };
        if layout.sectors()!=SECTORS || layout.sector_size()!=SECTOR_SIZE {
            debug!("sectors are {}x{}",layout.sectors(),layout.sector_size());
            return false;
        }
        if layout.track_count()!=MAX_TRACKS/2 && layout.track_count()!=MAX_TRACKS {
            debug!("unexpected track count {}",layout.track_count());
            return false;
        }
        let buf = match img.read_block(Block::TS([HEADER_TS[0] as usize,HEADER_TS[1] as usize])) {
            Ok(buf) => buf,
            Err(e) => {
                debug!("cannot read volume header: {}",e);
                return false;
            }
        };
        match VolumeHeader::from_bytes(&buf) {
            Ok(hdr) if hdr.magic==MAGIC => true,
            Ok(hdr) => {
                debug!("magic bytes are {}",hex::encode(hdr.magic));
                false
            },
            Err(_) => false
        }
    }
    pub fn mode(&self) -> Mode {
        self.vol.borrow().mode()
    }
    /// Is there a root directory handle alive
    pub fn root_is_live(&self) -> bool {
        match self.root.borrow().as_ref() {
            Some(weak) => weak.strong_count() > 0,
            None => false
        }
    }
    /// Install the DOS image on a freshly formatted disk, see `SystemFile`
    pub fn make_bootable(&mut self,dat: &[u8]) -> STDRESULT {
        self.vol.borrow_mut().make_bootable(dat)
    }
    /// Claim sectors directly, lowest first.  The list is empty if there is not enough space.
    pub fn allocate_blocks(&mut self,count: usize) -> Result<Vec<[u8;2]>,DYNERR> {
        self.vol.borrow_mut().allocate_blocks(count)
    }
    /// Return sectors to the bitmap, subject to the mode
    pub fn free_blocks(&mut self,blocks: &[[u8;2]]) -> STDRESULT {
        self.vol.borrow_mut().free_blocks(blocks)
    }
    /// The raw 24 bit map of one track
    pub fn track_map(&mut self,track: usize) -> Result<u32,DYNERR> {
        if track>=MAX_TRACKS {
            error!("track {} is beyond the bitmap",track);
            return Err(Box::new(img::Error::GeometryMismatch));
        }
        self.vol.borrow_mut().track_map(track)
    }
    /// Number of sectors in the directory chain
    pub fn dir_chain_len(&mut self) -> Result<usize,DYNERR> {
        self.vol.borrow_mut().dir_chain_len()
    }
    /// Check a label and put it in directory form
    fn prepare_label(&self,meta: &MetaData) -> Result<Vec<u8>,DYNERR> {
        let label = meta.get_string(MetaName::Name,DEFAULT_LABEL);
        if !validate_volume_name(&label) {
            self.vol.borrow().tolerate(Error::BadVolumeName,&format!("volume name {} will be truncated",label))?;
        }
        Ok(crate::parse_escaped_ascii(&label,false))
    }
}

impl DiskFS for Disk {
    fn volume_meta_description(&self) -> Vec<MetaDescription> {
        volume_meta_description()
    }
    fn file_meta_description(&self) -> Vec<MetaDescription> {
        file_meta_description()
    }
    fn format(&mut self,meta: &MetaData) -> STDRESULT {
        let label = self.prepare_label(meta)?;
        self.vol.borrow_mut().format(&label)
    }
    fn metadata(&mut self) -> Result<MetaData,DYNERR> {
        let mut ans = MetaData::new();
        ans.set(MetaName::Name,self.vol.borrow_mut().label()?);
        Ok(ans)
    }
    fn metadata_change(&mut self,meta: &MetaData) -> STDRESULT {
        if !meta.has(MetaName::Name) {
            debug!("no volume name to change");
            return Ok(());
        }
        let label = self.prepare_label(meta)?;
        self.vol.borrow_mut().set_label(&label)
    }
    fn root(&mut self) -> Rc<dyn Directory> {
        if let Some(live) = self.root.borrow().as_ref().and_then(|weak| weak.upgrade()) {
            return live;
        }
        debug!("creating root directory handle");
        let cache = Rc::clone(&self.root);
        let on_release = Box::new(move || {
            if let Ok(mut slot) = cache.try_borrow_mut() {
                *slot = None;
            }
        });
        let ans = Rc::new(RootDir::new(Rc::clone(&self.vol),on_release));
        *self.root.borrow_mut() = Some(Rc::downgrade(&ans));
        ans
    }
    fn num_free_blocks(&mut self) -> Result<usize,DYNERR> {
        self.vol.borrow_mut().free_block_count()
    }
    fn to_img_bytes(&mut self) -> Vec<u8> {
        self.vol.borrow_mut().to_img_bytes()
    }
}
