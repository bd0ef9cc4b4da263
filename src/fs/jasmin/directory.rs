//! # Jasmin disk structures
//! These are fixed length structures, with the DiskStruct trait.
//! Track-sector references are stored as `[track,sector]`, i.e., big endian.

use a2kit_macro::{DiskStruct,DiskStructError};
use a2kit_macro_derive::DiskStruct;
use num_traits::FromPrimitive;
use super::types::*;

/// Track 20 sector 1.  The bitmap has 3 bytes per track, little endian.
#[derive(DiskStruct)]
pub struct VolumeHeader {
    pub bitmap: [u8;246],
    pub magic: [u8;2],
    pub label: [u8;8]
}

/// One file record, 14 of these fit in a directory sector
#[derive(DiskStruct,Clone,Copy,PartialEq)]
pub struct DirectoryEntry {
    pub ts: [u8;2],
    pub lock: u8,
    pub name: [u8;12],
    pub kind: u8,
    pub sectors: [u8;2]
}

pub struct DirectorySector {
    /// not used by DOS, new sectors point to themselves
    pub this_ts: [u8;2],
    pub next_ts: [u8;2],
    pub entries: [DirectoryEntry;ENTRIES_PER_SECTOR]
}

/// Each file has a chain of these.  Only the first one carries the load address and length,
/// the others have 0xffff in those fields.
#[derive(DiskStruct)]
pub struct IndexSector {
    pub next: [u8;2],
    pub load_address: [u8;2],
    pub length: [u8;2],
    pub refs: [u8;250]
}

impl DiskStruct for DirectorySector {
    fn new() -> Self where Self: Sized {
        Self {
            this_ts: [0;2],
            next_ts: [0;2],
            entries: [DirectoryEntry::new();ENTRIES_PER_SECTOR]
        }
    }
    fn to_bytes(&self) -> Vec<u8> {
        let mut ans: Vec<u8> = Vec::new();
        ans.append(&mut self.this_ts.to_vec());
        ans.append(&mut self.next_ts.to_vec());
        for i in 0..self.entries.len() {
            ans.append(&mut self.entries[i].to_bytes());
        }
        return ans;
    }
    fn update_from_bytes(&mut self,bytes: &[u8]) -> Result<(),DiskStructError> {
        if bytes.len()<self.len() {
            return Err(DiskStructError::OutOfData);
        }
        self.this_ts = [bytes[0],bytes[1]];
        self.next_ts = [bytes[2],bytes[3]];
        let mut offset = 4;
        for i in 0..self.entries.len() {
            self.entries[i].update_from_bytes(&bytes[offset..offset+self.entries[i].len()])?;
            offset += self.entries[i].len();
        }
        Ok(())
    }
    fn from_bytes(bytes: &[u8]) -> Result<Self,DiskStructError> where Self: Sized {
        let mut ans = Self::new();
        ans.update_from_bytes(bytes)?;
        Ok(ans)
    }
    fn len(&self) -> usize {
        return 256;
    }
}

impl DirectoryEntry {
    pub fn is_locked(&self) -> bool {
        LockFlag::from_u8(self.lock)==Some(LockFlag::Locked)
    }
    pub fn is_sequential(&self) -> bool {
        FileKind::from_u8(self.kind)==Some(FileKind::Sequential)
    }
    pub fn sector_count(&self) -> usize {
        u16::from_le_bytes(self.sectors) as usize
    }
    /// The system pseudo-file is tagged by a null reference and a `.SYS` extension
    pub fn has_system_tag(&self) -> bool {
        self.ts==NO_REF && self.name[8..12]==SYSTEM_TAG
    }
}

impl IndexSector {
    /// An index sector with every byte 0xff, so unused references are invalid
    pub fn blank() -> Result<Self,DiskStructError> {
        Self::from_bytes(&[0xff;SECTOR_SIZE])
    }
    pub fn data_ref(&self,i: usize) -> [u8;2] {
        [self.refs[i*2],self.refs[i*2+1]]
    }
    pub fn set_data_ref(&mut self,i: usize,ts: [u8;2]) {
        self.refs[i*2] = ts[0];
        self.refs[i*2+1] = ts[1];
    }
    pub fn byte_length(&self) -> usize {
        u16::from_le_bytes(self.length) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(VolumeHeader::new().len(),256);
        assert_eq!(DirectoryEntry::new().len(),18);
        assert_eq!(DirectorySector::new().len(),256);
        assert_eq!(DirectorySector::new().to_bytes().len(),256);
        assert_eq!(IndexSector::new().len(),256);
    }

    #[test]
    fn directory_layout() {
        let mut buf = vec![0xff;256];
        buf[0..4].copy_from_slice(&[0,0,1,14]);
        buf[4+18..4+36].copy_from_slice(b"\x01\x02LHELLO   .BINS\x03\x00");
        let dir = DirectorySector::from_bytes(&buf).expect("bad sector");
        assert_eq!(dir.next_ts,[1,14]);
        let entry = &dir.entries[1];
        assert_eq!(entry.ts,[1,2]);
        assert!(entry.is_locked());
        assert!(entry.is_sequential());
        assert_eq!(entry.sector_count(),3);
        assert_eq!(&entry.name,b"HELLO   .BIN");
        assert_eq!(dir.entries[0].ts,[0xff,0xff]);
        assert_eq!(dir.to_bytes(),buf);
    }

    #[test]
    fn index_layout() {
        let mut idx = IndexSector::blank().expect("bad sector");
        idx.next = END_OF_CHAIN;
        idx.set_data_ref(0,[3,4]);
        idx.set_data_ref(124,[5,6]);
        let bytes = idx.to_bytes();
        assert_eq!(bytes[0..8].to_vec(),vec![0xff,0x00,0xff,0xff,0xff,0xff,3,4]);
        assert_eq!(bytes[254..256].to_vec(),vec![5,6]);
    }
}
