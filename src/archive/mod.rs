//! Containers that maps are stored in.

pub mod wad;
