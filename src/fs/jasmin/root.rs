//! Handles for the root directory and the files in it.
//! Handles share the volume and look up their directory record on every call,
//! so several handles to the same file stay consistent.

use std::cell::RefCell;
use std::rc::Rc;
use log::{debug,warn,error};
use super::types::*;
use super::directory::DirectoryEntry;
use super::catalog::NewEntry;
use super::volume::Volume;
use super::file_meta_description;
use crate::fs::{Directory,FileNode,DirEntry,MetaData,MetaName};
use crate::{STDRESULT,DYNERR};

/// The one and only directory.  `on_release` runs when the last reference goes away.
pub struct RootDir {
    vol: Rc<RefCell<Volume>>,
    on_release: Option<Box<dyn FnOnce()>>
}

pub struct DataFile {
    vol: Rc<RefCell<Volume>>,
    key: u64
}

/// The DOS image in blocks 0-61, listed as key 0
pub struct SystemFile {
    vol: Rc<RefCell<Volume>>,
    key: u64
}

impl RootDir {
    pub fn new(vol: Rc<RefCell<Volume>>,on_release: Box<dyn FnOnce()>) -> Self {
        Self {
            vol,
            on_release: Some(on_release)
        }
    }
}

impl Drop for RootDir {
    fn drop(&mut self) {
        debug!("releasing root directory");
        if let Some(release) = self.on_release.take() {
            release();
        }
    }
}

/// Check the metadata of a new or changed file, names are checked separately
/// so that they get their own error.  A new file is checked against the name it will
/// get, which is empty if none is given.
fn check_file_meta(vol: &Volume,meta: &MetaData,creating: bool) -> STDRESULT {
    if creating || meta.has(MetaName::Name) {
        let name = meta.get_string(MetaName::Name,"");
        if !validate_filename(&name) {
            vol.tolerate(Error::BadFileName,&format!("file name {} will be truncated",name))?;
        }
    }
    if vol.mode()==Mode::Strict {
        if let Err(e) = meta.validate(&file_meta_description()) {
            error!("{}",e);
            return Err(Box::new(Error::BadMetadata));
        }
    }
    if meta.get_number(MetaName::LoadingAddress,0) > 0xffff {
        vol.tolerate(Error::BadMetadata,"loading address will be truncated to 16 bits")?;
    }
    Ok(())
}

/// Changes to the directory record shared by both kinds of file
fn change_entry(vol: &Volume,entry: &mut DirectoryEntry,meta: &MetaData) -> STDRESULT {
    for name in [MetaName::Length,MetaName::SizeInBlocks] {
        if meta.has(name) {
            vol.tolerate(Error::ReadOnly,&format!("{} cannot be changed",name))?;
        }
    }
    if meta.has(MetaName::Locked) {
        entry.lock = LockFlag::from_flag(meta.get_flag(MetaName::Locked,false)) as u8;
    }
    if meta.has(MetaName::Name) {
        let name = crate::parse_escaped_ascii(&meta.get_string(MetaName::Name,""),false);
        entry.name = file_name_prepare(&name);
    }
    if meta.has(MetaName::Sequential) {
        entry.kind = FileKind::from_flag(meta.get_flag(MetaName::Sequential,true)) as u8;
    }
    Ok(())
}

fn entry_meta(entry: &DirectoryEntry) -> MetaData {
    let mut ans = MetaData::new();
    ans.set(MetaName::Name,read_file_name(&entry.name));
    ans.set(MetaName::Locked,entry.is_locked());
    ans.set(MetaName::Sequential,entry.is_sequential());
    ans.set(MetaName::SizeInBlocks,entry.sector_count() as u64);
    ans
}

impl Directory for RootDir {
    fn metadata(&self) -> MetaData {
        MetaData::new()
    }
    fn metadata_change(&self,_meta: &MetaData) -> STDRESULT {
        debug!("root directory has no metadata");
        Ok(())
    }
    fn contents(&self) -> Result<Vec<DirEntry>,DYNERR> {
        self.vol.borrow_mut().contents()
    }
    fn file_get(&self,key: u64) -> Result<Box<dyn FileNode>,DYNERR> {
        let mut vol = self.vol.borrow_mut();
        let entry = vol.get_entry(key)?;
        if vol.is_system_slot(key,&entry) {
            return Ok(Box::new(SystemFile { vol: Rc::clone(&self.vol), key }));
        }
        if !vol.is_ts_valid(entry.ts) {
            debug!("key {} is not in use",key);
            return Err(Box::new(Error::FileNotFound));
        }
        Ok(Box::new(DataFile { vol: Rc::clone(&self.vol), key }))
    }
    fn dir_get(&self,_key: u64) -> Result<Rc<dyn Directory>,DYNERR> {
        error!("Jasmin has no subdirectories");
        Err(Box::new(Error::DirectoriesNotSupported))
    }
    fn file_create(&self,meta: &MetaData) -> Result<Box<dyn FileNode>,DYNERR> {
        let mut vol = self.vol.borrow_mut();
        check_file_meta(&vol,meta,true)?;
        let (key,_entry) = vol.create_entry(&NewEntry::from_meta(meta))?;
        Ok(Box::new(DataFile { vol: Rc::clone(&self.vol), key }))
    }
    fn file_delete(&self,key: u64) -> STDRESULT {
        warn!("deleting files is not supported, key {} is unchanged",key);
        Ok(())
    }
}

impl FileNode for DataFile {
    fn key(&self) -> u64 {
        self.key
    }
    fn is_system(&self) -> bool {
        false
    }
    fn metadata(&self) -> Result<MetaData,DYNERR> {
        let mut vol = self.vol.borrow_mut();
        let entry = vol.get_entry(self.key)?;
        let mut ans = entry_meta(&entry);
        let (load_address,length) = vol.chain_info(entry.ts)?;
        ans.set(MetaName::LoadingAddress,load_address);
        ans.set(MetaName::Length,length as u64);
        Ok(ans)
    }
    fn metadata_change(&mut self,meta: &MetaData) -> STDRESULT {
        let mut vol = self.vol.borrow_mut();
        check_file_meta(&vol,meta,false)?;
        let mut entry = vol.get_entry(self.key)?;
        change_entry(&vol,&mut entry,meta)?;
        if meta.has(MetaName::LoadingAddress) {
            let addr = meta.get_number(MetaName::LoadingAddress,DEFAULT_LOAD_ADDRESS as u64);
            vol.set_load_address(entry.ts,addr as u16)?;
        }
        vol.update_entry(self.key,&entry)
    }
    fn read_all(&self) -> Result<Vec<u8>,DYNERR> {
        let mut vol = self.vol.borrow_mut();
        let entry = vol.get_entry(self.key)?;
        vol.read_chain(entry.ts)
    }
    fn replace(&mut self,dat: &[u8]) -> STDRESULT {
        let mut vol = self.vol.borrow_mut();
        let mut entry = vol.get_entry(self.key)?;
        vol.replace_chain(&mut entry,dat)?;
        vol.update_entry(self.key,&entry)
    }
}

impl FileNode for SystemFile {
    fn key(&self) -> u64 {
        self.key
    }
    fn is_system(&self) -> bool {
        true
    }
    fn metadata(&self) -> Result<MetaData,DYNERR> {
        let entry = self.vol.borrow_mut().get_entry(self.key)?;
        let mut ans = entry_meta(&entry);
        ans.set(MetaName::Length,(SYSTEM_BLOCKS*SECTOR_SIZE) as u64);
        Ok(ans)
    }
    fn metadata_change(&mut self,meta: &MetaData) -> STDRESULT {
        let mut vol = self.vol.borrow_mut();
        check_file_meta(&vol,meta,false)?;
        let mut entry = vol.get_entry(self.key)?;
        change_entry(&vol,&mut entry,meta)?;
        if meta.has(MetaName::LoadingAddress) {
            vol.tolerate(Error::ReadOnly,"system file has no loading address")?;
        }
        // the record has to keep the system tag or the file disappears
        if !entry.has_system_tag() {
            vol.tolerate(Error::BadFileName,"system file keeps its extension")?;
            entry.name[8..12].copy_from_slice(&SYSTEM_TAG);
        }
        vol.update_entry(self.key,&entry)
    }
    fn read_all(&self) -> Result<Vec<u8>,DYNERR> {
        self.vol.borrow_mut().read_system()
    }
    fn replace(&mut self,dat: &[u8]) -> STDRESULT {
        self.vol.borrow_mut().write_system(dat)
    }
}
