//! Free sector bitmap.
//! Each track has a 24 bit little endian map in the volume header.  Sector `s` is free
//! if bit `0x20000>>s` is set.  A track with no free sectors is stored as `0x800000`.

use log::{trace,debug,warn,error};
use super::types::*;
use super::directory::VolumeHeader;
use super::volume::Volume;
use crate::{STDRESULT,DYNERR};

impl VolumeHeader {
    pub fn get_track_map(&self,track: usize) -> u32 {
        let i = track*3;
        u32::from_le_bytes([self.bitmap[i],self.bitmap[i+1],self.bitmap[i+2],0])
    }
    pub fn save_track_map(&mut self,track: usize,map: u32) {
        let i = track*3;
        let slice = u32::to_le_bytes(map);
        self.bitmap[i..i+3].copy_from_slice(&slice[0..3]);
    }
    pub fn is_free(&self,ts: [u8;2]) -> bool {
        let map = self.get_track_map(ts[0] as usize);
        map!=FULL_TRACK && map & sector_bit(ts[1]) > 0
    }
    /// Count free sectors on the first `tracks` tracks, full tracks count zero
    pub fn free_count(&self,tracks: usize) -> usize {
        let mut ans = 0;
        for track in 0..tracks {
            let map = self.get_track_map(track);
            if map!=FULL_TRACK {
                ans += (map & EMPTY_TRACK).count_ones() as usize;
            }
        }
        ans
    }
    /// Claim `count` sectors, lowest track and sector first.
    /// Returns an empty list, with no change, if there is not enough space.
    pub fn allocate(&mut self,count: usize,tracks: usize) -> Vec<[u8;2]> {
        let mut ans: Vec<[u8;2]> = Vec::new();
        if self.free_count(tracks) < count {
            debug!("cannot allocate {} sectors",count);
            return ans;
        }
        for track in 0..tracks {
            if ans.len()==count {
                break;
            }
            let mut map = self.get_track_map(track);
            if map==FULL_TRACK {
                continue;
            }
            for sector in 1..=SECTORS as u8 {
                if ans.len()==count {
                    break;
                }
                if map & sector_bit(sector) > 0 {
                    ans.push([track as u8,sector]);
                    map &= !sector_bit(sector);
                }
            }
            if map==0 {
                trace!("track {} is full",track);
                map = FULL_TRACK;
            }
            self.save_track_map(track,map);
        }
        ans
    }
    /// Take specific sectors out of the bitmap, they should be free beforehand
    pub fn reserve(&mut self,blocks: &[[u8;2]]) {
        for ts in blocks {
            let track = ts[0] as usize;
            let mut map = self.get_track_map(track);
            if map==FULL_TRACK {
                continue;
            }
            map &= !sector_bit(ts[1]);
            if map==0 {
                map = FULL_TRACK;
            }
            self.save_track_map(track,map);
        }
    }
    /// Return sectors to the bitmap.  A full track is treated as having no free sectors.
    /// In compatible mode, invalid references are skipped and freeing a free sector does nothing.
    /// In strict mode either is an error, and nothing changes.
    pub fn free(&mut self,blocks: &[[u8;2]],tracks: usize,mode: Mode) -> STDRESULT {
        let valid = |ts: &[u8;2]| ts[1]>=1 && ts[1] as usize<=SECTORS && (ts[0] as usize)<tracks;
        if mode==Mode::Strict {
            for (i,ts) in blocks.iter().enumerate() {
                if !valid(ts) {
                    error!("cannot free invalid reference {:?}",ts);
                    return Err(Box::new(Error::BadReference));
                }
                if self.is_free(*ts) || blocks[0..i].contains(ts) {
                    error!("track {} sector {} is already free",ts[0],ts[1]);
                    return Err(Box::new(Error::DoubleFree));
                }
            }
        }
        for ts in blocks {
            if !valid(ts) {
                warn!("skipping invalid reference {:?}",ts);
                continue;
            }
            let track = ts[0] as usize;
            let mut map = self.get_track_map(track);
            if map==FULL_TRACK {
                map = 0;
            }
            map |= sector_bit(ts[1]);
            self.save_track_map(track,map);
        }
        Ok(())
    }
}

impl Volume {
    pub fn free_block_count(&mut self) -> Result<usize,DYNERR> {
        Ok(self.get_header()?.free_count(self.tracks()))
    }
    pub fn track_map(&mut self,track: usize) -> Result<u32,DYNERR> {
        Ok(self.get_header()?.get_track_map(track))
    }
    /// Allocate and save the bitmap; the list is empty if there is not enough space
    pub fn allocate_blocks(&mut self,count: usize) -> Result<Vec<[u8;2]>,DYNERR> {
        let mut hdr = self.get_header()?;
        let ans = hdr.allocate(count,self.tracks());
        if ans.len()>0 {
            self.save_header(&hdr)?;
        }
        Ok(ans)
    }
    pub fn free_blocks(&mut self,blocks: &[[u8;2]]) -> STDRESULT {
        let mut hdr = self.get_header()?;
        hdr.free(blocks,self.tracks(),self.mode())?;
        self.save_header(&hdr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2kit_macro::DiskStruct;

    fn fresh(tracks: usize) -> VolumeHeader {
        let mut hdr = VolumeHeader::new();
        for track in 0..MAX_TRACKS {
            let map = match track {
                t if t>=tracks => FULL_TRACK,
                HEADER_TRACK => HEADER_TRACK_MAP,
                _ => EMPTY_TRACK
            };
            hdr.save_track_map(track,map);
        }
        hdr
    }

    #[test]
    fn counting() {
        assert_eq!(fresh(41).free_count(41),40*17+15);
        assert_eq!(fresh(82).free_count(82),81*17+15);
    }

    #[test]
    fn allocation_order() {
        let mut hdr = fresh(41);
        assert_eq!(hdr.allocate(3,41),vec![[0,1],[0,2],[0,3]]);
        assert_eq!(hdr.get_track_map(0),0x03fff);
        let more = hdr.allocate(16,41);
        assert_eq!(more[13],[0,17]);
        assert_eq!(more[14],[1,1]);
        assert_eq!(hdr.get_track_map(0),FULL_TRACK);
        assert_eq!(hdr.free_count(41),40*17+15-19);
    }

    #[test]
    fn skips_header_sectors() {
        let mut hdr = fresh(41);
        hdr.reserve(&(0..20*17).map(block_to_ts).collect::<Vec<[u8;2]>>());
        assert_eq!(hdr.allocate(2,41),vec![[20,3],[20,4]]);
    }

    #[test]
    fn not_enough() {
        let mut hdr = fresh(41);
        let n = hdr.free_count(41);
        assert!(hdr.allocate(n+1,41).is_empty());
        assert_eq!(hdr.free_count(41),n);
        assert_eq!(hdr.allocate(n,41).len(),n);
        assert_eq!(hdr.free_count(41),0);
    }

    #[test]
    fn free_full_track() {
        let mut hdr = fresh(41);
        hdr.allocate(17,41);
        assert_eq!(hdr.get_track_map(0),FULL_TRACK);
        hdr.free(&[[0,5]],41,Mode::Compatible).expect("free failed");
        assert_eq!(hdr.get_track_map(0),sector_bit(5));
        assert_eq!(hdr.free_count(41),40*17+15-16);
    }

    #[test]
    fn double_free() {
        let mut hdr = fresh(41);
        let blocks = hdr.allocate(2,41);
        hdr.free(&blocks,41,Mode::Compatible).expect("free failed");
        let count = hdr.free_count(41);
        hdr.free(&blocks,41,Mode::Compatible).expect("compatible double free failed");
        assert_eq!(hdr.free_count(41),count);
        assert!(hdr.free(&blocks,41,Mode::Strict).is_err());
        let blocks = hdr.allocate(2,41);
        let map = hdr.get_track_map(0);
        assert!(hdr.free(&[blocks[0],blocks[0]],41,Mode::Strict).is_err());
        assert!(hdr.free(&[[41,1]],41,Mode::Strict).is_err());
        assert_eq!(hdr.get_track_map(0),map);
        hdr.free(&[[41,1],[0,0]],41,Mode::Compatible).expect("invalid references should be skipped");
        assert_eq!(hdr.get_track_map(0),map);
    }
}
