//! # `jasmin` main library
//!
//! This library manipulates disk images holding the Oric Jasmin file system.
//! The Jasmin controller uses 3 inch disks with 41 tracks per side, 17 sectors per track,
//! and 256 bytes per sector.  Both single and double sided disks are handled.
//!
//! ## Architecture
//!
//! Disk image operations are built around two trait objects:
//! * `img::DiskImage` reads and writes sectors, does not try to interpret a file system
//! * `fs::DiskFS` imposes a file system on the sector data
//!
//! When a `DiskFS` object is created it takes ownership of some `DiskImage`.
//! It then uses this owned image as storage.  Any changes are not permanent until the
//! image is saved to whatever file system is hosting the library.
//!
//! Files and the root directory are reached through handles, see `fs::Directory` and `fs::FileNode`.
//!
//! ## File System
//!
//! The Jasmin file system has a single directory, a free sector bitmap in the volume header,
//! and a chain of index sectors for each file.  There is also a fixed system region at the
//! start of the disk that holds the DOS image, which appears as a pseudo-file.
//!
//! ## Disk Images
//!
//! Only raw sector dumps are supported, ordered by track and then sector.
//! Tracks on the second side follow all the tracks on the first side.
//!
//! ## Logging
//!
//! Logging goes through the `log` facade.  Block level access is logged at `trace` level,
//! structural decisions at `debug`, and tolerated irregularities at `warn`.

pub mod fs;
pub mod img;

use img::DiskImage;
use fs::DiskFS;
use std::fmt::Write;
use log::{warn,info};
use regex::Regex;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const KNOWN_FILE_EXTENSIONS: &str = "dsk,jas";

/// Save the image file (make changes permanent)
pub fn save_img(disk: &mut Box<dyn DiskFS>,img_path: &str) -> STDRESULT {
    std::fs::write(img_path,disk.to_img_bytes())?;
    Ok(())
}

/// Return the file system on a disk image, or None if one cannot be found.
/// If found, the file system takes ownership of the disk image.
fn try_img(mut img: Box<dyn DiskImage>) -> Option<Box<dyn DiskFS>> {
    if fs::jasmin::Disk::test_img(&mut img) {
        info!("identified Jasmin file system");
        return Some(Box::new(fs::jasmin::Disk::from_img(img,fs::jasmin::Mode::default())));
    }
    return None;
}

/// Given a bytestream return a DiskFS, or Err if the bytestream cannot be interpreted.
/// Optional `maybe_ext` restricts the image types that will be tried based on file extension.
pub fn create_fs_from_bytestream(disk_img_data: &[u8],maybe_ext: Option<&str>) -> Result<Box<dyn DiskFS>,DYNERR> {
    let ext = match maybe_ext {
        Some(x) => x.to_string().to_lowercase(),
        None => "".to_string()
    };
    if img::dsk::file_extensions().contains(&ext) || ext=="" {
        if let Ok(img) = img::dsk::Dsk::from_bytes(disk_img_data) {
            info!("possible Jasmin sector dump");
            if let Some(disk) = try_img(Box::new(img)) {
                return Ok(disk);
            }
        }
    }
    warn!("cannot match any file system");
    return Err(Box::new(fs::Error::FileSystemMismatch));
}

/// Calls `create_fs_from_bytestream` getting the bytes from a file.
/// The pathname must already be in the right format for the file system.
/// File extension will be used to restrict image types that are tried,
/// unless the extension is unknown, in which case all will be tried.
pub fn create_fs_from_file(img_path: &str) -> Result<Box<dyn DiskFS>,DYNERR> {
    match std::fs::read(img_path) {
        Ok(disk_img_data) => {
            let mut maybe_ext = img_path.split('.').last();
            if let Some(ext) = maybe_ext {
                if !KNOWN_FILE_EXTENSIONS.split(',').any(|known| known==ext.to_lowercase()) {
                    maybe_ext = None;
                }
            }
            create_fs_from_bytestream(&disk_img_data,maybe_ext)
        },
        Err(e) => Err(Box::new(e))
    }
}

/// This takes any bytes and makes an ascii friendly string
/// by using hex escapes, e.g., `\xFF`.
/// if `escape_cc` is true, ascii control characters are also escaped.
/// This is intended for directory strings.
pub fn escaped_ascii_from_bytes(bytes: &[u8],escape_cc: bool) -> String {
    let mut result = String::new();
    let (lb,ub) = match escape_cc {
        true => (0x20,0x7e),
        false => (0x00,0x7f)
    };
    for b in bytes {
        if *b>=lb && *b<=ub {
            result.push(*b as char);
        } else {
            write!(&mut result,"\\x{:02X}",b).expect("unreachable");
        }
    }
    return result;
}

/// Interpret a UTF8 string as pure ascii and put into bytes.
/// Non-ascii characters are omitted from the result, but arbitrary
/// bytes can be introduced using escapes, e.g., `\xFF`.
/// if `caps` is true the ascii is put in upper case.
pub fn parse_escaped_ascii(s: &str,caps: bool) -> Vec<u8> {
    let mut ans: Vec<u8> = Vec::new();
    let hex_patt = Regex::new(r"\\x[0-9A-Fa-f]{2}").expect("unreachable");
    let mut curs = 0;
    for esc in hex_patt.find_iter(s) {
        push_ascii(&mut ans,&s[curs..esc.start()],caps);
        ans.append(&mut hex::decode(&s[esc.start()+2..esc.end()]).expect("unreachable"));
        curs = esc.end();
    }
    push_ascii(&mut ans,&s[curs..],caps);
    return ans;
}

fn push_ascii(ans: &mut Vec<u8>,s: &str,caps: bool) {
    for c in s.chars().filter(|c| c.is_ascii()) {
        match caps {
            true => ans.push(c.to_ascii_uppercase() as u8),
            false => ans.push(c as u8)
        }
    }
}

#[test]
fn test_escapes() {
    assert_eq!(escaped_ascii_from_bytes(&[0x41,0x00,0x42,0xff],true),"A\\x00B\\xFF");
    assert_eq!(escaped_ascii_from_bytes(&[0x41,0x0d],false),"A\r");
    assert_eq!(parse_escaped_ascii("a\\x01b\\xFF",false),vec![0x61,0x01,0x62,0xff]);
    assert_eq!(parse_escaped_ascii("hello.bin",true),b"HELLO.BIN".to_vec());
    assert_eq!(parse_escaped_ascii("caf\u{e9}",false),b"caf".to_vec());
    let raw = vec![0x53,0x7f,0x80,0x20];
    assert_eq!(parse_escaped_ascii(&escaped_ascii_from_bytes(&raw,true),false),raw);
}
