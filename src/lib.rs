//! Doom map node building and spatial queries.
//!
//! A map goes from WAD bytes to a [`Map`] like so:
//!
//! ```no_run
//! # fn load(buf: &[u8]) -> dengbsp::errors::Result<()> {
//! let wad = dengbsp::parse_wad(buf)?;
//! let block = wad.find_map("MAP01")?;
//! let map = match dengbsp::parse_doom_map(&wad, &block)? {
//!     dengbsp::BareMap::Doom(bare) => dengbsp::Map::from_bare(&bare, &dengbsp::BuildConfig::default())?,
//!     dengbsp::BareMap::Hexen(bare) => dengbsp::Map::from_bare(&bare, &dengbsp::BuildConfig::default())?,
//! };
//! println!("{} subsectors", map.subsectors().len());
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;

pub mod archive;
pub mod binarytree;
pub mod blockmap;
pub mod bsp;
pub mod config;
pub mod errors;
pub mod geom;
pub mod handle;
pub mod kdtree;
pub mod map;
pub mod parse;

#[cfg(test)]
mod test_maps;

pub use crate::archive::wad::{BareWAD, BareWADDirectoryEntry, BareWADHeader, WADItem, WADMapEntryBlock, WADType};
pub use crate::blockmap::SubsectorBlockmap;
pub use crate::config::BuildConfig;
pub use crate::handle::Handle;
pub use crate::map::{Map, MapFormat, MapName};
pub use crate::parse::map::{parse_doom_map, BareBinaryLine, BareBinaryMap, BareMap};
pub use crate::parse::wad::parse_wad;
