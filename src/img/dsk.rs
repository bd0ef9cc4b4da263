//! ## Support for Jasmin sector dumps
//!
//! DSK images are a simple sequential dump of the already-decoded sector data.
//! The ordering is all of side 0 followed by all of side 1, which is the same
//! as the file system's own track numbering.
//! N.b. the file system cannot be verified until we get up to the `fs` layer.

use a2kit_macro::DiskStructError;
use log::{trace,debug,error};
use crate::img;
use crate::fs::Block;
use crate::{STDRESULT,DYNERR};
use super::names::*;

pub fn file_extensions() -> Vec<String> {
    vec!["dsk".to_string(),"jas".to_string()]
}

/// Wrapper for DSK data.
pub struct Dsk {
    kind: img::DiskKind,
    sec_size: usize,
    cylinders: usize,
    heads: usize,
    sectors: usize,
    data: Vec<u8>
}

impl Dsk {
    /// Create an unformatted image, all bytes zero
    pub fn create(kind: img::DiskKind) -> Result<Self,DYNERR> {
        let layout = match kind {
            img::DiskKind::D3(layout) => layout,
            _ => {
                error!("DSK cannot hold {}",kind);
                return Err(Box::new(img::Error::UnknownDiskKind));
            }
        };
        Ok(Self {
            kind,
            sec_size: layout.sector_size(),
            cylinders: layout.cylinders(),
            heads: layout.sides(),
            sectors: layout.sectors(),
            data: vec![0;layout.byte_capacity()]
        })
    }
    /// Byte offset of a sector, the track runs over both sides
    fn offset(&self,track: usize,sec: usize) -> Result<usize,DYNERR> {
        let end_track = self.cylinders * self.heads;
        if track>=end_track || sec<1 || sec>self.sectors {
            error!("track/sector range should be 0-{}/1-{}",end_track-1,self.sectors);
            return Err(Box::new(img::Error::SectorAccess));
        }
        Ok((track*self.sectors + sec - 1)*self.sec_size)
    }
    fn track_of(&self,cyl: usize,head: usize) -> Result<usize,DYNERR> {
        if cyl>=self.cylinders || head>=self.heads {
            error!("cylinder/head range should be 0-{}/0-{}",self.cylinders-1,self.heads-1);
            return Err(Box::new(img::Error::GeometryMismatch));
        }
        Ok(cyl + head*self.cylinders)
    }
    fn get_ts(&self,track: usize,sec: usize) -> Result<Vec<u8>,DYNERR> {
        let offset = self.offset(track,sec)?;
        Ok(self.data[offset..offset+self.sec_size].to_vec())
    }
    fn put_ts(&mut self,track: usize,sec: usize,dat: &[u8]) -> STDRESULT {
        let offset = self.offset(track,sec)?;
        let padded = super::quantize_block(dat,self.sec_size);
        self.data[offset..offset+self.sec_size].copy_from_slice(&padded);
        Ok(())
    }
}

impl img::DiskImage for Dsk {
    fn track_count(&self) -> usize {
        return self.cylinders * self.heads;
    }
    fn byte_capacity(&self) -> usize {
        return self.data.len();
    }
    fn read_block(&mut self,addr: Block) -> Result<Vec<u8>,DYNERR> {
        trace!("read {}",addr);
        let [track,sec] = addr.ts(self.sectors);
        self.get_ts(track,sec)
    }
    fn write_block(&mut self,addr: Block,dat: &[u8]) -> STDRESULT {
        trace!("write {}",addr);
        let [track,sec] = addr.ts(self.sectors);
        self.put_ts(track,sec,dat)
    }
    fn read_sector(&mut self,cyl: usize,head: usize,sec: usize) -> Result<Vec<u8>,DYNERR> {
        trace!("reading {}/{}/{}",cyl,head,sec);
        let track = self.track_of(cyl,head)?;
        self.get_ts(track,sec)
    }
    fn write_sector(&mut self,cyl: usize,head: usize,sec: usize,dat: &[u8]) -> STDRESULT {
        trace!("writing {}/{}/{}",cyl,head,sec);
        let track = self.track_of(cyl,head)?;
        self.put_ts(track,sec,dat)
    }
    fn from_bytes(data: &[u8]) -> Result<Self,DiskStructError> {
        // try to match known sizes
        let kind = match data.len() {
            l if l==ORIC_JASMIN_SS.byte_capacity() => ORIC_JASMIN_SS_KIND,
            l if l==ORIC_JASMIN_DS.byte_capacity() => ORIC_JASMIN_DS_KIND,
            _ => return Err(DiskStructError::IllegalValue)
        };
        let layout = match kind {
            img::DiskKind::D3(l) => l,
            _ => return Err(DiskStructError::UnexpectedValue)
        };
        debug!("DSK size matches {}",kind);
        Ok(Self {
            kind,
            sec_size: layout.sector_size(),
            cylinders: layout.cylinders(),
            heads: layout.sides(),
            sectors: layout.sectors(),
            data: data.to_vec()
        })
    }
    fn file_extensions(&self) -> Vec<String> {
        file_extensions()
    }
    fn kind(&self) -> img::DiskKind {
        self.kind
    }
    fn to_bytes(&mut self) -> Vec<u8> {
        return self.data.clone();
    }
}
