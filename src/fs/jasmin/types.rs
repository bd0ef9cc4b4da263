use num_derive::FromPrimitive;

pub const SECTORS: usize = 17;
pub const SECTOR_SIZE: usize = 256;
/// Tracks counted over both sides
pub const MAX_TRACKS: usize = 82;
pub const HEADER_TS: [u8;2] = [20,1];
pub const FIRST_DIR_TS: [u8;2] = [20,2];
pub const HEADER_TRACK: usize = 20;
/// Bitmap value meaning every sector of the track is in use
pub const FULL_TRACK: u32 = 0x800000;
pub const EMPTY_TRACK: u32 = 0x1ffff;
/// Header track with the header and first directory sector in use
pub const HEADER_TRACK_MAP: u32 = 0x07fff;
pub const FORMAT_FILL: u8 = 0x6c;
/// Filler for the unused end of the last data sector of a file
pub const PAD_FILL: u8 = 0x55;
pub const END_OF_CHAIN: [u8;2] = [0xff,0x00];
pub const NO_REF: [u8;2] = [0,0];
pub const MAGIC: [u8;2] = [0x80,0x80];
pub const DEFAULT_LABEL: &str = "UNTITLED";
pub const DEFAULT_LOAD_ADDRESS: u16 = 0x501;
pub const SYSTEM_BLOCKS: usize = 62;
pub const SYSTEM_NAME: &str = "SYSTEM.SYS";
pub const SYSTEM_TAG: [u8;4] = [b'.',b'S',b'Y',b'S'];
pub const ENTRIES_PER_SECTOR: usize = 14;
pub const REFS_PER_INDEX: usize = 125;
pub const MAX_FILE_LEN: usize = 0xffff;
pub const MAX_DIRECTORY_REPS: usize = MAX_TRACKS*SECTORS;
pub const MAX_INDEX_REPS: usize = MAX_TRACKS*SECTORS;

/// Enumerates Jasmin errors.  The `Display` trait will print a short upper case message such as `DISK FULL`.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("DISK FULL")]
    DiskFull,
    #[error("INVALID KEY")]
    InvalidKey,
    #[error("FILE NOT FOUND")]
    FileNotFound,
    #[error("DIRECTORIES NOT SUPPORTED")]
    DirectoriesNotSupported,
    #[error("WRONG SIZE")]
    WrongSize,
    #[error("FILE TOO LARGE")]
    FileTooLarge,
    #[error("BAD FILE NAME")]
    BadFileName,
    #[error("BAD VOLUME NAME")]
    BadVolumeName,
    #[error("BAD METADATA")]
    BadMetadata,
    #[error("READ ONLY")]
    ReadOnly,
    #[error("DOUBLE FREE")]
    DoubleFree,
    #[error("BAD REFERENCE")]
    BadReference,
    #[error("SYSTEM REGION IN USE")]
    SystemRegionInUse,
    #[error("BAD FORMAT")]
    BadFormat
}

/// How to treat irregular requests.
/// * `Compatible` behaves like the Jasmin DOS: names are truncated, double frees are ignored.
/// * `Strict` turns these into errors.
#[derive(PartialEq,Eq,Clone,Copy,Debug,Default)]
pub enum Mode {
    #[default]
    Compatible,
    Strict
}

/// Lock byte of a directory record, use `FromPrimitive` to decode
#[derive(FromPrimitive,PartialEq,Eq,Clone,Copy,Debug)]
pub enum LockFlag {
    Locked = 0x4c,
    Unlocked = 0x55
}

/// Access byte of a directory record, use `FromPrimitive` to decode
#[derive(FromPrimitive,PartialEq,Eq,Clone,Copy,Debug)]
pub enum FileKind {
    Sequential = 0x53,
    Direct = 0x44
}

impl LockFlag {
    pub fn from_flag(locked: bool) -> Self {
        match locked {
            true => Self::Locked,
            false => Self::Unlocked
        }
    }
}

impl FileKind {
    pub fn from_flag(sequential: bool) -> Self {
        match sequential {
            true => Self::Sequential,
            false => Self::Direct
        }
    }
}

/// Flat block index of a track-sector reference, the reference must be valid
pub fn ts_to_block(ts: [u8;2]) -> usize {
    ts[0] as usize * SECTORS + ts[1] as usize - 1
}

pub fn block_to_ts(block: usize) -> [u8;2] {
    [(block / SECTORS) as u8,(block % SECTORS + 1) as u8]
}

/// Bit in the track map that is set while the sector is free
pub fn sector_bit(sector: u8) -> u32 {
    0x20000u32.checked_shr(sector as u32).unwrap_or(0)
}

/// Put a name into the 12 byte directory form `NNNNNNNN.EEE`.
/// Longer components are cut off, the result is the same if this is applied again.
pub fn file_name_prepare(fname: &[u8]) -> [u8;12] {
    let mut ans = [b' ';12];
    ans[8] = b'.';
    let mut i = 0;
    while i<8 && i<fname.len() && fname[i]!=b'.' {
        ans[i] = fname[i];
        i += 1;
    }
    while i<fname.len() && fname[i]!=b'.' {
        i += 1;
    }
    if i<fname.len() {
        i += 1;
    }
    for j in 9..12 {
        if i>=fname.len() {
            break;
        }
        ans[j] = fname[i];
        i += 1;
    }
    ans
}

/// Display form of a directory name.  Trailing spaces go away on both sides of the dot,
/// but the dot stays, so a name without extension reads `NAME.`.
pub fn read_file_name(field: &[u8;12]) -> String {
    let main_len = field[0..8].iter().rposition(|c| *c!=b' ').map_or(0,|p| p+1);
    let ext_len = field[8..12].iter().rposition(|c| *c!=b' ').map_or(0,|p| p+1);
    let raw = [&field[0..main_len],&field[8..8+ext_len]].concat();
    crate::escaped_ascii_from_bytes(&raw,true)
}

/// Either `NAME` with 1 to 8 characters, or `NAME.EXT` with 1 to 8 characters before
/// the first dot and at most 3 after it.
pub fn validate_filename(name: &str) -> bool {
    let bytes = crate::parse_escaped_ascii(name,false);
    match bytes.iter().position(|c| *c==b'.') {
        Some(pos) => pos>0 && pos<=8 && bytes.len()-pos-1<=3,
        None => bytes.len()>0 && bytes.len()<=8
    }
}

pub fn validate_volume_name(name: &str) -> bool {
    crate::parse_escaped_ascii(name,false).len()<=8
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn addressing() {
        assert_eq!(ts_to_block(HEADER_TS),340);
        assert_eq!(ts_to_block(FIRST_DIR_TS),341);
        assert_eq!(ts_to_block([0,1]),0);
        assert_eq!(ts_to_block([81,17]),82*17-1);
        for block in [0,16,17,340,1393] {
            assert_eq!(ts_to_block(block_to_ts(block)),block);
        }
        assert_eq!(sector_bit(1),0x10000);
        assert_eq!(sector_bit(17),0x1);
    }

    #[test]
    fn name_prepare() {
        assert_eq!(&file_name_prepare(b"HELLO.BIN"),b"HELLO   .BIN");
        assert_eq!(&file_name_prepare(b"HELLO"),b"HELLO   .   ");
        assert_eq!(&file_name_prepare(b"TOOLONGNAME.TEXT"),b"TOOLONGN.TEX");
        assert_eq!(&file_name_prepare(b".X"),b"        .X  ");
        assert_eq!(&file_name_prepare(b"A.B.C"),b"A       .B.C");
        assert_eq!(&file_name_prepare(b""),b"        .   ");
    }

    #[test]
    fn name_prepare_idempotent() {
        for name in ["HELLO.BIN","HELLO","TOOLONGNAME.TEXT","A.B.C","",".X","ABCDEFGH.IJK","X.Y Z"] {
            let once = file_name_prepare(name.as_bytes());
            let twice = file_name_prepare(&once);
            assert_eq!(once,twice,"normalizing {} twice changed it",name);
        }
    }

    #[test]
    fn name_display() {
        assert_eq!(read_file_name(b"HELLO   .BIN"),"HELLO.BIN");
        assert_eq!(read_file_name(b"HELLO   .   "),"HELLO.");
        assert_eq!(read_file_name(b"SYSTEM  .SYS"),"SYSTEM.SYS");
        assert_eq!(read_file_name(&[0x41,0x01,0x20,0x20,0x20,0x20,0x20,0x20,0x2e,0x42,0x20,0x20]),"A\\x01.B");
    }

    #[test]
    fn name_validation() {
        assert!(validate_filename("HELLO"));
        assert!(validate_filename("HELLO.BIN"));
        assert!(validate_filename("ABCDEFGH.IJK"));
        assert!(validate_filename("A."));
        assert!(!validate_filename(""));
        assert!(!validate_filename(".BIN"));
        assert!(!validate_filename("ABCDEFGHI"));
        assert!(!validate_filename("ABCDEFGHI.B"));
        assert!(!validate_filename("HELLO.TEXT"));
        assert!(validate_volume_name("UNTITLED"));
        assert!(!validate_volume_name("TOOLONGLABEL"));
    }

    #[test]
    fn flag_bytes() {
        assert_eq!(LockFlag::from_u8(b'L'),Some(LockFlag::Locked));
        assert_eq!(LockFlag::from_u8(b'U'),Some(LockFlag::Unlocked));
        assert_eq!(FileKind::from_u8(b'S'),Some(FileKind::Sequential));
        assert_eq!(FileKind::from_u8(b'D'),Some(FileKind::Direct));
        assert_eq!(FileKind::from_u8(b'X'),None);
        assert_eq!(FileKind::from_flag(true) as u8,b'S');
        assert_eq!(LockFlag::from_flag(false) as u8,b'U');
        assert_eq!(Mode::default(),Mode::Compatible);
    }
}
