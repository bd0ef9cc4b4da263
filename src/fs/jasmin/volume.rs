//! Storage shared by the file system and its handles.
//! The `Volume` owns the disk image; its methods are spread over several files
//! according to the structure they work on.

use a2kit_macro::DiskStruct;
use log::{trace,debug,warn,error};
use super::types::*;
use super::directory::*;
use crate::img;
use crate::fs::Block;
use crate::{STDRESULT,DYNERR};

pub struct Volume {
    img: Box<dyn img::DiskImage>,
    /// tracks on the medium, counting both sides
    tracks: usize,
    mode: Mode
}

impl Volume {
    pub fn new(img: Box<dyn img::DiskImage>,mode: Mode) -> Self {
        let tracks = usize::min(img.track_count(),MAX_TRACKS);
        Self {
            img,
            tracks,
            mode
        }
    }
    pub fn mode(&self) -> Mode {
        self.mode
    }
    pub fn tracks(&self) -> usize {
        self.tracks
    }
    pub fn to_img_bytes(&mut self) -> Vec<u8> {
        self.img.to_bytes()
    }
    /// A reference is valid if the sector is 1-17 and the track is on the medium
    pub fn is_ts_valid(&self,ts: [u8;2]) -> bool {
        ts[1]>=1 && ts[1] as usize<=SECTORS && (ts[0] as usize)<self.tracks
    }
    pub fn read_ts(&mut self,ts: [u8;2]) -> Result<Vec<u8>,DYNERR> {
        self.img.read_block(Block::TS([ts[0] as usize,ts[1] as usize]))
    }
    pub fn write_ts(&mut self,ts: [u8;2],dat: &[u8]) -> STDRESULT {
        self.img.write_block(Block::TS([ts[0] as usize,ts[1] as usize]),dat)
    }
    pub fn get_header(&mut self) -> Result<VolumeHeader,DYNERR> {
        Ok(VolumeHeader::from_bytes(&self.read_ts(HEADER_TS)?)?)
    }
    pub fn save_header(&mut self,hdr: &VolumeHeader) -> STDRESULT {
        self.write_ts(HEADER_TS,&hdr.to_bytes())
    }
    pub fn get_dir_sector(&mut self,ts: [u8;2]) -> Result<DirectorySector,DYNERR> {
        Ok(DirectorySector::from_bytes(&self.read_ts(ts)?)?)
    }
    pub fn get_index_sector(&mut self,ts: [u8;2]) -> Result<IndexSector,DYNERR> {
        Ok(IndexSector::from_bytes(&self.read_ts(ts)?)?)
    }
    /// Write an empty file system.  Every sector is filled with 0x6c, the bitmap marks every
    /// track free except for the header and first directory sectors.  Bitmap entries for tracks
    /// that are not on the medium are marked full.
    pub fn format(&mut self,label: &[u8]) -> STDRESULT {
        debug!("formatting {} tracks",self.tracks);
        let fill = vec![FORMAT_FILL;SECTOR_SIZE];
        for track in 0..self.tracks {
            for sector in 1..=SECTORS {
                self.write_ts([track as u8,sector as u8],&fill)?;
            }
        }
        let mut hdr = VolumeHeader::new();
        for track in 0..MAX_TRACKS {
            let map = match track {
                t if t>=self.tracks => FULL_TRACK,
                HEADER_TRACK => HEADER_TRACK_MAP,
                _ => EMPTY_TRACK
            };
            hdr.save_track_map(track,map);
        }
        hdr.magic = MAGIC;
        hdr.label = pad_label(label);
        self.save_header(&hdr)?;
        let mut dir = DirectorySector::from_bytes(&[0xff;SECTOR_SIZE])?;
        dir.this_ts = NO_REF;
        dir.next_ts = NO_REF;
        self.write_ts(FIRST_DIR_TS,&dir.to_bytes())
    }
    /// Label with trailing spaces removed, non-ascii is escaped
    pub fn label(&mut self) -> Result<String,DYNERR> {
        let hdr = self.get_header()?;
        let len = hdr.label.iter().rposition(|c| *c!=b' ').map_or(0,|p| p+1);
        Ok(crate::escaped_ascii_from_bytes(&hdr.label[0..len],true))
    }
    pub fn set_label(&mut self,label: &[u8]) -> STDRESULT {
        let mut hdr = self.get_header()?;
        hdr.label = pad_label(label);
        self.save_header(&hdr)
    }
    /// Blocks 0-61 in order, regardless of the bitmap
    pub fn read_system(&mut self) -> Result<Vec<u8>,DYNERR> {
        let mut ans: Vec<u8> = Vec::new();
        for block in 0..SYSTEM_BLOCKS {
            ans.append(&mut self.read_ts(block_to_ts(block))?);
        }
        Ok(ans)
    }
    /// Overwrite blocks 0-61, the data must be exactly 62 sectors.  The bitmap is not touched.
    pub fn write_system(&mut self,dat: &[u8]) -> STDRESULT {
        if dat.len()!=SYSTEM_BLOCKS*SECTOR_SIZE {
            error!("system image must be {} bytes, got {}",SYSTEM_BLOCKS*SECTOR_SIZE,dat.len());
            return Err(Box::new(Error::WrongSize));
        }
        for block in 0..SYSTEM_BLOCKS {
            trace!("system block {}",block);
            self.write_ts(block_to_ts(block),&dat[block*SECTOR_SIZE..(block+1)*SECTOR_SIZE])?;
        }
        Ok(())
    }
    /// Install a system image on a freshly formatted volume.  The system blocks are taken
    /// out of the bitmap and the first directory record becomes the `SYSTEM.SYS` pseudo-file.
    pub fn make_bootable(&mut self,dat: &[u8]) -> STDRESULT {
        if dat.len()!=SYSTEM_BLOCKS*SECTOR_SIZE {
            error!("system image must be {} bytes, got {}",SYSTEM_BLOCKS*SECTOR_SIZE,dat.len());
            return Err(Box::new(Error::WrongSize));
        }
        let mut dir = self.get_dir_sector(FIRST_DIR_TS)?;
        let first = dir.entries[0];
        if self.is_ts_valid(first.ts) || first.has_system_tag() {
            error!("first directory record is in use");
            return Err(Box::new(Error::SystemRegionInUse));
        }
        let mut hdr = self.get_header()?;
        let region: Vec<[u8;2]> = (0..SYSTEM_BLOCKS).map(block_to_ts).collect();
        if let Some(ts) = region.iter().find(|ts| !hdr.is_free(**ts)) {
            error!("system region is in use at {:?}",ts);
            return Err(Box::new(Error::SystemRegionInUse));
        }
        hdr.reserve(&region);
        self.write_system(dat)?;
        dir.entries[0] = DirectoryEntry {
            ts: NO_REF,
            lock: LockFlag::Locked as u8,
            name: file_name_prepare(SYSTEM_NAME.as_bytes()),
            kind: FileKind::Sequential as u8,
            sectors: u16::to_le_bytes(SYSTEM_BLOCKS as u16)
        };
        self.write_ts(FIRST_DIR_TS,&dir.to_bytes())?;
        self.save_header(&hdr)
    }
    /// Log and possibly refuse an irregular request, depending on the mode
    pub fn tolerate(&self,err: Error,msg: &str) -> STDRESULT {
        match self.mode {
            Mode::Compatible => {
                warn!("{}",msg);
                Ok(())
            },
            Mode::Strict => {
                error!("{}",msg);
                Err(Box::new(err))
            }
        }
    }
}

fn pad_label(label: &[u8]) -> [u8;8] {
    let mut ans = [b' ';8];
    for i in 0..usize::min(8,label.len()) {
        ans[i] = label[i];
    }
    ans
}
