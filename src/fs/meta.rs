//! # Metadata property bag
//!
//! Metadata moves between a file system and its host as a map from a small fixed
//! vocabulary of names to loosely typed values.  Each file system publishes a list of
//! `MetaDescription` giving defaults, writability, and validators for the names it uses.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use log::{debug,warn};
use crate::STDRESULT;

/// Enumerates metadata errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("unknown metadata key")]
    UnknownKey,
    #[error("metadata value has the wrong type")]
    WrongType,
    #[error("metadata value is not acceptable")]
    Invalid
}

#[derive(PartialEq,Eq,PartialOrd,Ord,Clone,Copy,Hash,Debug)]
pub enum MetaName {
    Name,
    LoadingAddress,
    Length,
    SizeInBlocks,
    Locked,
    Sequential
}

impl fmt::Display for MetaName {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f,"name"),
            Self::LoadingAddress => write!(f,"loading_address"),
            Self::Length => write!(f,"length"),
            Self::SizeInBlocks => write!(f,"size_in_blocks"),
            Self::Locked => write!(f,"locked"),
            Self::Sequential => write!(f,"sequential")
        }
    }
}

impl FromStr for MetaName {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "loading_address" => Ok(Self::LoadingAddress),
            "length" => Ok(Self::Length),
            "size_in_blocks" => Ok(Self::SizeInBlocks),
            "locked" => Ok(Self::Locked),
            "sequential" => Ok(Self::Sequential),
            _ => Err(Error::UnknownKey)
        }
    }
}

#[derive(PartialEq,Eq,Clone,Debug)]
pub enum MetaValue {
    String(String),
    Number(u64),
    Flag(bool)
}

impl MetaValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None
        }
    }
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None
        }
    }
    fn same_type(&self,other: &MetaValue) -> bool {
        std::mem::discriminant(self)==std::mem::discriminant(other)
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f,"{}",s),
            Self::Number(n) => write!(f,"{}",n),
            Self::Flag(b) => write!(f,"{}",b)
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}
impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}
impl From<u64> for MetaValue {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}
impl From<u16> for MetaValue {
    fn from(n: u16) -> Self {
        Self::Number(n as u64)
    }
}
impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

/// Describes one metadata item a file system understands
#[derive(Clone)]
pub struct MetaDescription {
    pub name: MetaName,
    pub default: MetaValue,
    pub read_only: bool,
    pub validator: Option<fn(&MetaValue) -> bool>,
    pub tooltip: &'static str
}

impl MetaDescription {
    pub fn new(name: MetaName,default: MetaValue,read_only: bool,validator: Option<fn(&MetaValue) -> bool>,tooltip: &'static str) -> Self {
        Self {
            name,
            default,
            read_only,
            validator,
            tooltip
        }
    }
}

/// The property bag, iteration is in `MetaName` order
#[derive(PartialEq,Eq,Clone,Debug,Default)]
pub struct MetaData {
    map: BTreeMap<MetaName,MetaValue>
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set<V: Into<MetaValue>>(&mut self,name: MetaName,val: V) {
        self.map.insert(name,val.into());
    }
    pub fn has(&self,name: MetaName) -> bool {
        self.map.contains_key(&name)
    }
    pub fn get(&self,name: MetaName) -> Option<&MetaValue> {
        self.map.get(&name)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&MetaName,&MetaValue)> {
        self.map.iter()
    }
    pub fn get_string(&self,name: MetaName,default: &str) -> String {
        match self.map.get(&name) {
            Some(MetaValue::String(s)) => s.clone(),
            Some(v) => {
                warn!("{} should be a string, got {}",name,v);
                default.to_string()
            },
            None => default.to_string()
        }
    }
    pub fn get_number(&self,name: MetaName,default: u64) -> u64 {
        match self.map.get(&name) {
            Some(MetaValue::Number(n)) => *n,
            Some(v) => {
                warn!("{} should be a number, got {}",name,v);
                default
            },
            None => default
        }
    }
    pub fn get_flag(&self,name: MetaName,default: bool) -> bool {
        match self.map.get(&name) {
            Some(MetaValue::Flag(b)) => *b,
            Some(v) => {
                warn!("{} should be a flag, got {}",name,v);
                default
            },
            None => default
        }
    }
    /// Check every item against a list of descriptions.
    /// Read-only items are accepted here, it is up to the file system what to do with them.
    pub fn validate(&self,desc: &[MetaDescription]) -> STDRESULT {
        for (name,val) in self.map.iter() {
            let d = match desc.iter().find(|d| d.name==*name) {
                Some(d) => d,
                None => {
                    debug!("{} is not described",name);
                    return Err(Box::new(Error::UnknownKey));
                }
            };
            if !val.same_type(&d.default) {
                debug!("{} has value {} of the wrong type",name,val);
                return Err(Box::new(Error::WrongType));
            }
            if let Some(validator) = d.validator {
                if !validator(val) {
                    debug!("{} = {} failed validation",name,val);
                    return Err(Box::new(Error::Invalid));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_name(v: &MetaValue) -> bool {
        v.as_string().map_or(false,|s| s.len()<=8)
    }

    #[test]
    fn getters_and_defaults() {
        let mut meta = MetaData::new();
        meta.set(MetaName::Name,"HELLO");
        meta.set(MetaName::LoadingAddress,0x600u64);
        meta.set(MetaName::Locked,true);
        assert_eq!(meta.get_string(MetaName::Name,""),"HELLO");
        assert_eq!(meta.get_number(MetaName::LoadingAddress,0x501),0x600);
        assert_eq!(meta.get_number(MetaName::Length,7),7);
        assert!(meta.get_flag(MetaName::Locked,false));
        // wrong type falls back to the default
        assert_eq!(meta.get_number(MetaName::Name,3),3);
        assert!(!meta.has(MetaName::Sequential));
        let names: Vec<String> = meta.iter().map(|(k,_v)| k.to_string()).collect();
        assert_eq!(names,vec!["name","loading_address","locked"]);
    }

    #[test]
    fn name_strings() {
        for s in ["name","loading_address","length","size_in_blocks","locked","sequential"] {
            assert_eq!(MetaName::from_str(s).expect("unknown").to_string(),s);
        }
        assert!(MetaName::from_str("color").is_err());
    }

    #[test]
    fn validation() {
        let desc = vec![
            MetaDescription::new(MetaName::Name,MetaValue::from(""),false,Some(short_name),"name"),
            MetaDescription::new(MetaName::Locked,MetaValue::from(false),false,None,"locked")
        ];
        let mut meta = MetaData::new();
        meta.set(MetaName::Name,"SHORT");
        meta.set(MetaName::Locked,true);
        assert!(meta.validate(&desc).is_ok());
        meta.set(MetaName::Name,"MUCHTOOLONG");
        assert!(meta.validate(&desc).is_err());
        meta.set(MetaName::Name,"SHORT");
        meta.set(MetaName::Locked,3u64);
        assert!(meta.validate(&desc).is_err());
        meta.set(MetaName::Locked,false);
        meta.set(MetaName::Length,0u64);
        assert!(meta.validate(&desc).is_err());
    }
}
