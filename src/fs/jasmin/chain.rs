//! File content chains.
//! A file is a chain of index sectors.  Each index sector lists up to 125 data sectors,
//! the first one also holds the load address and the length in bytes.

use a2kit_macro::DiskStruct;
use log::{trace,debug,warn,error};
use super::types::*;
use super::directory::*;
use super::volume::Volume;
use crate::{STDRESULT,DYNERR};

impl Volume {
    /// Read the file whose first index sector is `first`.  The walk stops at the recorded
    /// length or at the first invalid reference.  The result always has the recorded length.
    pub fn read_chain(&mut self,first: [u8;2]) -> Result<Vec<u8>,DYNERR> {
        let mut idx = self.get_index_sector(first)?;
        let length = idx.byte_length();
        let mut ans: Vec<u8> = Vec::new();
        let mut reps = 0;
        'walk: while ans.len() < length {
            for j in 0..REFS_PER_INDEX {
                if ans.len() >= length {
                    break 'walk;
                }
                let dref = idx.data_ref(j);
                if !self.is_ts_valid(dref) {
                    break 'walk;
                }
                ans.append(&mut self.read_ts(dref)?);
            }
            if !self.is_ts_valid(idx.next) {
                break;
            }
            reps += 1;
            if reps > MAX_INDEX_REPS {
                error!("index chain is too long, disk may be damaged");
                return Err(Box::new(Error::BadFormat));
            }
            trace!("next index sector {:?}",idx.next);
            idx = self.get_index_sector(idx.next)?;
        }
        if ans.len() < length {
            warn!("file chain ended after {} of {} bytes",ans.len(),length);
        }
        ans.resize(length,0);
        Ok(ans)
    }
    /// Collect the sectors of a chain for freeing, walking as many sectors as the directory
    /// says the file has.  Also returns the load address from the first index sector.
    fn collect_chain(&mut self,first: [u8;2],declared: usize) -> Result<(Vec<[u8;2]>,u16),DYNERR> {
        let mut ans: Vec<[u8;2]> = Vec::new();
        let mut load_address = DEFAULT_LOAD_ADDRESS;
        let mut iref = first;
        let mut i = 0;
        while i < declared {
            if !self.is_ts_valid(iref) {
                warn!("index chain ended with {} of {} sectors",ans.len(),declared);
                break;
            }
            let idx = self.get_index_sector(iref)?;
            if i==0 {
                load_address = u16::from_le_bytes(idx.load_address);
            }
            ans.push(iref);
            let mut j = 0;
            while j < REFS_PER_INDEX && i+j+1 < declared {
                ans.push(idx.data_ref(j));
                j += 1;
            }
            iref = idx.next;
            i += REFS_PER_INDEX + 1;
        }
        Ok((ans,load_address))
    }
    /// Rewrite the index chain of `entry` to hold `dat`.  The old chain is released and a new one
    /// allocated, the last data sector is padded with 0x55.  The entry's reference and sector count
    /// are updated, but persisting the entry is up to the caller.
    /// If there is not enough space nothing changes.
    pub fn replace_chain(&mut self,entry: &mut DirectoryEntry,dat: &[u8]) -> STDRESULT {
        if dat.len() > MAX_FILE_LEN {
            error!("file length {} exceeds {}",dat.len(),MAX_FILE_LEN);
            return Err(Box::new(Error::FileTooLarge));
        }
        let cur_ns = entry.sector_count();
        let data_ns = usize::max(1,(dat.len() + SECTOR_SIZE - 1) / SECTOR_SIZE);
        let need_ns = data_ns + (data_ns + REFS_PER_INDEX - 1) / REFS_PER_INDEX;
        let mut hdr = self.get_header()?;
        if cur_ns < need_ns && hdr.free_count(self.tracks()) < need_ns - cur_ns {
            error!("need {} more sectors",need_ns - cur_ns);
            return Err(Box::new(Error::DiskFull));
        }
        let (old,load_address) = self.collect_chain(entry.ts,cur_ns)?;
        hdr.free(&old,self.tracks(),self.mode())?;
        let blocks = hdr.allocate(need_ns,self.tracks());
        if blocks.is_empty() {
            // happens if the old chain was shorter than the directory said
            error!("need {} sectors",need_ns);
            return Err(Box::new(Error::DiskFull));
        }
        debug!("file chain of {} sectors starting at {:?}",need_ns,blocks[0]);
        for (g,group) in blocks.chunks(REFS_PER_INDEX + 1).enumerate() {
            let mut idx = IndexSector::blank()?;
            if g==0 {
                idx.load_address = u16::to_le_bytes(load_address);
                idx.length = u16::to_le_bytes(dat.len() as u16);
            }
            idx.next = match blocks.get((g+1)*(REFS_PER_INDEX + 1)) {
                Some(ts) => *ts,
                None => END_OF_CHAIN
            };
            for (j,dref) in group[1..].iter().enumerate() {
                idx.set_data_ref(j,*dref);
                let dpos = SECTOR_SIZE * (g*REFS_PER_INDEX + j);
                let mut buf = vec![PAD_FILL;SECTOR_SIZE];
                if dpos < dat.len() {
                    let end = usize::min(dpos + SECTOR_SIZE,dat.len());
                    buf[0..end-dpos].copy_from_slice(&dat[dpos..end]);
                }
                self.write_ts(*dref,&buf)?;
            }
            self.write_ts(group[0],&idx.to_bytes())?;
        }
        self.save_header(&hdr)?;
        entry.ts = blocks[0];
        entry.sectors = u16::to_le_bytes(need_ns as u16);
        Ok(())
    }
    /// Load address and length from the first index sector
    pub fn chain_info(&mut self,first: [u8;2]) -> Result<(u16,usize),DYNERR> {
        let idx = self.get_index_sector(first)?;
        Ok((u16::from_le_bytes(idx.load_address),idx.byte_length()))
    }
    pub fn set_load_address(&mut self,first: [u8;2],addr: u16) -> STDRESULT {
        let mut idx = self.get_index_sector(first)?;
        idx.load_address = u16::to_le_bytes(addr);
        self.write_ts(first,&idx.to_bytes())
    }
}
