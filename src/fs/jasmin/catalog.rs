//! Directory chain.
//! The directory starts at track 20 sector 2 and grows by linking new sectors.
//! A file is keyed by its position, 14 keys per directory sector, so keys are stable
//! as long as the chain is not rearranged.  Sectors are never removed from the chain.

use a2kit_macro::DiskStruct;
use log::{debug,error};
use super::types::*;
use super::directory::*;
use super::volume::Volume;
use crate::fs::{DirEntry,EntryType,MetaData,MetaName};
use crate::{STDRESULT,DYNERR};

/// What to write into a new directory record
pub struct NewEntry {
    pub name: [u8;12],
    pub locked: bool,
    pub sequential: bool,
    pub load_address: u16
}

impl NewEntry {
    pub fn from_meta(meta: &MetaData) -> Self {
        let name = crate::parse_escaped_ascii(&meta.get_string(MetaName::Name,""),false);
        Self {
            name: file_name_prepare(&name),
            locked: meta.get_flag(MetaName::Locked,false),
            sequential: meta.get_flag(MetaName::Sequential,true),
            load_address: meta.get_number(MetaName::LoadingAddress,DEFAULT_LOAD_ADDRESS as u64) as u16
        }
    }
}

impl Volume {
    /// Next sector in the directory chain, if any
    fn next_dir_ts(&self,dir: &DirectorySector) -> Option<[u8;2]> {
        match dir.next_ts {
            NO_REF => None,
            ts if self.is_ts_valid(ts) => Some(ts),
            _ => None
        }
    }
    fn check_reps(reps: usize) -> STDRESULT {
        if reps>MAX_DIRECTORY_REPS {
            error!("directory chain is too long, disk may be damaged");
            return Err(Box::new(Error::BadFormat));
        }
        Ok(())
    }
    /// Is this the synthetic system entry
    pub fn is_system_slot(&self,key: u64,entry: &DirectoryEntry) -> bool {
        key==0 && entry.has_system_tag()
    }
    /// Find the directory sector holding `key`, returns (sector reference, sector, slot)
    pub fn get_dir_block(&mut self,key: u64) -> Result<([u8;2],DirectorySector,usize),DYNERR> {
        let mut ts = FIRST_DIR_TS;
        let mut dir = self.get_dir_sector(ts)?;
        let mut rel = key;
        let mut reps = 0;
        while rel >= ENTRIES_PER_SECTOR as u64 {
            ts = match self.next_dir_ts(&dir) {
                Some(next) => next,
                None => {
                    debug!("key {} is past the end of the directory",key);
                    return Err(Box::new(Error::InvalidKey));
                }
            };
            reps += 1;
            Self::check_reps(reps)?;
            dir = self.get_dir_sector(ts)?;
            rel -= ENTRIES_PER_SECTOR as u64;
        }
        Ok((ts,dir,rel as usize))
    }
    /// Number of sectors in the directory chain
    pub fn dir_chain_len(&mut self) -> Result<usize,DYNERR> {
        let mut dir = self.get_dir_sector(FIRST_DIR_TS)?;
        let mut ans = 1;
        while let Some(ts) = self.next_dir_ts(&dir) {
            ans += 1;
            Self::check_reps(ans)?;
            dir = self.get_dir_sector(ts)?;
        }
        Ok(ans)
    }
    /// List files in chain order and then slot order
    pub fn contents(&mut self) -> Result<Vec<DirEntry>,DYNERR> {
        let mut ans: Vec<DirEntry> = Vec::new();
        let mut dir = self.get_dir_sector(FIRST_DIR_TS)?;
        let mut key: u64 = 0;
        let mut reps = 0;
        loop {
            for entry in dir.entries.iter() {
                if self.is_system_slot(key,entry) {
                    ans.push(DirEntry { name: read_file_name(&entry.name), typ: EntryType::SystemFile, key });
                } else if self.is_ts_valid(entry.ts) {
                    ans.push(DirEntry { name: read_file_name(&entry.name), typ: EntryType::File, key });
                }
                key += 1;
            }
            match self.next_dir_ts(&dir) {
                Some(ts) => {
                    reps += 1;
                    Self::check_reps(reps)?;
                    dir = self.get_dir_sector(ts)?;
                },
                None => break
            }
        }
        Ok(ans)
    }
    pub fn get_entry(&mut self,key: u64) -> Result<DirectoryEntry,DYNERR> {
        let (_ts,dir,slot) = self.get_dir_block(key)?;
        Ok(dir.entries[slot])
    }
    /// Overwrite the record for `key`
    pub fn update_entry(&mut self,key: u64,entry: &DirectoryEntry) -> STDRESULT {
        let (ts,mut dir,slot) = self.get_dir_block(key)?;
        dir.entries[slot] = *entry;
        self.write_ts(ts,&dir.to_bytes())
    }
    /// Create a directory record and the initial index and data sectors.
    /// If every slot is taken a directory sector is added to the chain.
    /// Nothing changes if there is not enough space.
    pub fn create_entry(&mut self,new: &NewEntry) -> Result<(u64,DirectoryEntry),DYNERR> {
        // one index sector and one data sector, plus one if the directory has to grow
        let mut needed = 2;
        let mut ts = FIRST_DIR_TS;
        let mut dir = self.get_dir_sector(ts)?;
        let mut key: u64 = 0;
        let mut slot: Option<usize> = None;
        let mut reps = 0;
        loop {
            for i in 0..ENTRIES_PER_SECTOR {
                let entry = &dir.entries[i];
                if !self.is_ts_valid(entry.ts) && !self.is_system_slot(key,entry) {
                    slot = Some(i);
                    break;
                }
                key += 1;
            }
            if slot.is_some() {
                break;
            }
            match self.next_dir_ts(&dir) {
                Some(next) => {
                    reps += 1;
                    Self::check_reps(reps)?;
                    ts = next;
                    dir = self.get_dir_sector(ts)?;
                },
                None => {
                    needed += 1;
                    break;
                }
            }
        }
        let mut hdr = self.get_header()?;
        let blocks = hdr.allocate(needed,self.tracks());
        if blocks.is_empty() {
            error!("no room for a new file");
            return Err(Box::new(Error::DiskFull));
        }
        let mut idx = IndexSector::blank()?;
        idx.next = END_OF_CHAIN;
        idx.load_address = u16::to_le_bytes(new.load_address);
        idx.length = [0,0];
        idx.set_data_ref(0,blocks[1]);
        self.write_ts(blocks[0],&idx.to_bytes())?;
        if needed==3 {
            debug!("adding directory sector {:?}",blocks[2]);
            dir.next_ts = blocks[2];
            self.write_ts(ts,&dir.to_bytes())?;
            ts = blocks[2];
            dir = DirectorySector::from_bytes(&[0xff;SECTOR_SIZE])?;
            dir.this_ts = ts;
            dir.next_ts = END_OF_CHAIN;
            slot = Some(0);
        }
        let entry = DirectoryEntry {
            ts: blocks[0],
            lock: LockFlag::from_flag(new.locked) as u8,
            name: new.name,
            kind: FileKind::from_flag(new.sequential) as u8,
            sectors: u16::to_le_bytes(2)
        };
        dir.entries[slot.unwrap_or(0)] = entry;
        self.write_ts(ts,&dir.to_bytes())?;
        self.save_header(&hdr)?;
        debug!("created file with key {}",key);
        Ok((key,entry))
    }
}
