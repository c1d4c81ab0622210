//! The intermediate level model the node builder works on.
//!
//! A `BspLevel` holds its own copy of the map geometry, indexed by typed
//! handles.  It is populated from a parsed map, grows while the builder splits
//! segments, can be pruned of unused elements before it is turned into the
//! final runtime tables, and is then freed.

use std::cmp::Ordering;

use bit_vec::BitVec;

use crate::errors::{ErrorKind, Result};
use crate::geom::{BBox, Coord, Point};
use crate::handle::Handle;
use crate::parse::map::{BareBinaryLine, BareBinaryMap};
use super::edgetip::EdgeTips;
use super::DIST_EPSILON;

bitflags! {
    /// Properties of a linedef, worked out once when the map is loaded.
    pub struct LineFlags: u8 {
        /// Has both a front and a back side.
        const TWOSIDED = 0x01;
        /// Both ends sit at the same spot; the builder ignores the line.
        const ZEROLENGTH = 0x02;
        /// Both sides face the same sector.
        const SELFREF = 0x04;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Facing {
    Front,
    Back,
}

#[derive(Debug)]
pub struct MVertex {
    index: usize,
    pub pos: Point,
    /// Number of linedef endpoints using this vertex.
    pub ref_count: u32,
    /// Coincident vertex this one stands in for, if it is a duplicate.
    pub equiv: Option<Handle<MVertex>>,
    pub tips: EdgeTips<Handle<MHEdge>>,
}

impl MVertex {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug)]
pub struct MLinedef {
    index: usize,
    pub start: Handle<MVertex>,
    pub end: Handle<MVertex>,
    pub front: Option<Handle<MSidedef>>,
    pub back: Option<Handle<MSidedef>>,
    pub flags: LineFlags,
    /// Flags as stored in the map lump.
    pub mapflags: u16,
    pub special: u16,
    pub tag: u16,
}

impl MLinedef {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn side(&self, facing: Facing) -> Option<Handle<MSidedef>> {
        match facing {
            Facing::Front => self.front,
            Facing::Back => self.back,
        }
    }
}

#[derive(Debug)]
pub struct MSidedef {
    index: usize,
    pub sector: Handle<MSector>,
    pub x_offset: i16,
    pub y_offset: i16,
    pub upper_texture: String,
    pub lower_texture: String,
    pub middle_texture: String,
}

impl MSidedef {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Default)]
pub struct MSector {
    index: usize,
    pub floor_height: i16,
    pub ceiling_height: i16,
    pub floor_texture: String,
    pub ceiling_texture: String,
    pub light: i16,
    pub special: u16,
    pub tag: u16,
}

impl MSector {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A convex leaf of the BSP.
#[derive(Debug)]
pub struct MSubsec {
    index: usize,
    pub hedges: Vec<Handle<MHEdge>>,
    pub sector: Option<Handle<MSector>>,
    pub bbox: BBox,
}

impl MSubsec {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A directed piece of a linedef side, or a miniseg along a partition line
/// when `linedef` is `None`.  The sector lies on its right.
#[derive(Debug)]
pub struct MHEdge {
    index: usize,
    pub start: Handle<MVertex>,
    pub end: Handle<MVertex>,
    pub linedef: Option<Handle<MLinedef>>,
    pub facing: Facing,
    pub sector: Handle<MSector>,
    pub twin: Option<Handle<MHEdge>>,
}

impl MHEdge {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_miniseg(&self) -> bool {
        self.linedef.is_none()
    }
}

/// Per-array index remapping produced by `BspLevel::clean_map`; `None` marks a
/// pruned element.
#[derive(Debug, Default)]
pub struct CleanReport {
    pub vertices: Vec<Option<usize>>,
    pub linedefs: Vec<Option<usize>>,
    pub sidedefs: Vec<Option<usize>>,
    pub sectors: Vec<Option<usize>>,
}

fn count_pruned(remap: &[Option<usize>]) -> usize {
    remap.iter().filter(|entry| entry.is_none()).count()
}

impl CleanReport {
    pub fn pruned_vertices(&self) -> usize {
        count_pruned(&self.vertices)
    }

    pub fn pruned_linedefs(&self) -> usize {
        count_pruned(&self.linedefs)
    }

    pub fn pruned_sidedefs(&self) -> usize {
        count_pruned(&self.sidedefs)
    }

    pub fn pruned_sectors(&self) -> usize {
        count_pruned(&self.sectors)
    }
}

#[derive(Debug, Default)]
pub struct BspLevel {
    vertices: Vec<MVertex>,
    linedefs: Vec<MLinedef>,
    sidedefs: Vec<MSidedef>,
    sectors: Vec<MSector>,
    subsecs: Vec<MSubsec>,
    hedges: Vec<MHEdge>,
}

impl BspLevel {
    pub fn new() -> Self {
        BspLevel::default()
    }

    /// Builds a level from a parsed map, validating every cross reference.
    pub fn load_map<L: BareBinaryLine>(bare: &BareBinaryMap<L>) -> Result<BspLevel> {
        let mut level = BspLevel::new();

        for bare_vertex in bare.vertices.iter() {
            level.new_vertex(Point::new(bare_vertex.x as Coord, bare_vertex.y as Coord));
        }

        for bare_sector in bare.sectors.iter() {
            let handle = level.new_sector();
            let sector = level.lookup_sector_mut(handle);
            sector.floor_height = bare_sector.floor_height;
            sector.ceiling_height = bare_sector.ceiling_height;
            sector.floor_texture = bare_sector.floor_texture.into();
            sector.ceiling_texture = bare_sector.ceiling_texture.into();
            sector.light = bare_sector.light;
            sector.special = bare_sector.sector_type as u16;
            sector.tag = bare_sector.sector_tag as u16;
        }

        for (index, bare_side) in bare.sides.iter().enumerate() {
            // Source ports read these as unsigned, so we do too
            let sector = bare_side.sector as u16 as usize;
            if sector >= level.sectors.len() {
                bail!(ErrorKind::BadReference("SIDEDEFS", index, sector));
            }
            let handle = level.new_sidedef(sector.into());
            let side = level.lookup_sidedef_mut(handle);
            side.x_offset = bare_side.x_offset;
            side.y_offset = bare_side.y_offset;
            side.upper_texture = bare_side.upper_texture.into();
            side.lower_texture = bare_side.lower_texture.into();
            side.middle_texture = bare_side.middle_texture.into();
        }

        for (index, bare_line) in bare.lines.iter().enumerate() {
            let (v0, v1) = bare_line.vertex_indices();
            let (v0, v1) = (v0 as u16 as usize, v1 as u16 as usize);
            for &vertex in [v0, v1].iter() {
                if vertex >= level.vertices.len() {
                    bail!(ErrorKind::BadReference("LINEDEFS", index, vertex));
                }
            }
            let (front, back) = bare_line.side_indices();
            let front = level.side_reference(index, front)?;
            let back = level.side_reference(index, back)?;

            let handle = level.new_linedef(v0.into(), v1.into());
            let start = level.vertices[v0].pos;
            let end = level.vertices[v1].pos;

            let mut flags = LineFlags::empty();
            if (end.x - start.x).abs() < DIST_EPSILON && (end.y - start.y).abs() < DIST_EPSILON {
                flags |= LineFlags::ZEROLENGTH;
            }
            if let (Some(front), Some(back)) = (front, back) {
                flags |= LineFlags::TWOSIDED;
                if level.sidedefs[front.index()].sector == level.sidedefs[back.index()].sector {
                    flags |= LineFlags::SELFREF;
                }
            }

            let line = level.lookup_linedef_mut(handle);
            line.front = front;
            line.back = back;
            line.flags = flags;
            line.mapflags = bare_line.flags() as u16;
            line.special = bare_line.special();
            line.tag = bare_line.sector_tag();
        }

        debug!(
            "Loaded level: {} vertices, {} linedefs, {} sidedefs, {} sectors",
            level.vertices.len(), level.linedefs.len(), level.sidedefs.len(), level.sectors.len());
        Ok(level)
    }

    fn side_reference(&self, line: usize, raw: i16) -> Result<Option<Handle<MSidedef>>> {
        if raw == -1 {
            return Ok(None);
        }
        let index = raw as u16 as usize;
        if index >= self.sidedefs.len() {
            bail!(ErrorKind::BadReference("LINEDEFS", line, index));
        }
        Ok(Some(index.into()))
    }

    // Factories

    pub fn new_vertex(&mut self, pos: Point) -> Handle<MVertex> {
        let index = self.vertices.len();
        self.vertices.push(MVertex {
            index,
            pos,
            ref_count: 0,
            equiv: None,
            tips: EdgeTips::new(),
        });
        index.into()
    }

    pub fn new_linedef(&mut self, start: Handle<MVertex>, end: Handle<MVertex>) -> Handle<MLinedef> {
        self.vertices[start.index()].ref_count += 1;
        self.vertices[end.index()].ref_count += 1;
        let index = self.linedefs.len();
        self.linedefs.push(MLinedef {
            index,
            start,
            end,
            front: None,
            back: None,
            flags: LineFlags::empty(),
            mapflags: 0,
            special: 0,
            tag: 0,
        });
        index.into()
    }

    pub fn new_sidedef(&mut self, sector: Handle<MSector>) -> Handle<MSidedef> {
        let index = self.sidedefs.len();
        self.sidedefs.push(MSidedef {
            index,
            sector,
            x_offset: 0,
            y_offset: 0,
            upper_texture: "-".into(),
            lower_texture: "-".into(),
            middle_texture: "-".into(),
        });
        index.into()
    }

    pub fn new_sector(&mut self) -> Handle<MSector> {
        let index = self.sectors.len();
        self.sectors.push(MSector { index, ..MSector::default() });
        index.into()
    }

    pub fn new_subsec(&mut self) -> Handle<MSubsec> {
        let index = self.subsecs.len();
        self.subsecs.push(MSubsec {
            index,
            hedges: Vec::new(),
            sector: None,
            bbox: BBox::zero(),
        });
        index.into()
    }

    pub fn new_hedge(
        &mut self,
        start: Handle<MVertex>,
        end: Handle<MVertex>,
        linedef: Option<Handle<MLinedef>>,
        facing: Facing,
        sector: Handle<MSector>,
    ) -> Handle<MHEdge> {
        let index = self.hedges.len();
        self.hedges.push(MHEdge {
            index,
            start,
            end,
            linedef,
            facing,
            sector,
            twin: None,
        });
        index.into()
    }

    // Lookups; all of these panic on a handle from some other level

    pub fn lookup_vertex(&self, handle: Handle<MVertex>) -> &MVertex {
        &self.vertices[handle.index()]
    }

    pub fn lookup_vertex_mut(&mut self, handle: Handle<MVertex>) -> &mut MVertex {
        &mut self.vertices[handle.index()]
    }

    pub fn lookup_linedef(&self, handle: Handle<MLinedef>) -> &MLinedef {
        &self.linedefs[handle.index()]
    }

    pub fn lookup_linedef_mut(&mut self, handle: Handle<MLinedef>) -> &mut MLinedef {
        &mut self.linedefs[handle.index()]
    }

    pub fn lookup_sidedef(&self, handle: Handle<MSidedef>) -> &MSidedef {
        &self.sidedefs[handle.index()]
    }

    pub fn lookup_sidedef_mut(&mut self, handle: Handle<MSidedef>) -> &mut MSidedef {
        &mut self.sidedefs[handle.index()]
    }

    pub fn lookup_sector(&self, handle: Handle<MSector>) -> &MSector {
        &self.sectors[handle.index()]
    }

    pub fn lookup_sector_mut(&mut self, handle: Handle<MSector>) -> &mut MSector {
        &mut self.sectors[handle.index()]
    }

    pub fn lookup_subsec(&self, handle: Handle<MSubsec>) -> &MSubsec {
        &self.subsecs[handle.index()]
    }

    pub fn lookup_subsec_mut(&mut self, handle: Handle<MSubsec>) -> &mut MSubsec {
        &mut self.subsecs[handle.index()]
    }

    pub fn lookup_hedge(&self, handle: Handle<MHEdge>) -> &MHEdge {
        &self.hedges[handle.index()]
    }

    pub fn lookup_hedge_mut(&mut self, handle: Handle<MHEdge>) -> &mut MHEdge {
        &mut self.hedges[handle.index()]
    }

    pub fn vertices(&self) -> &[MVertex] {
        &self.vertices
    }

    pub fn linedefs(&self) -> &[MLinedef] {
        &self.linedefs
    }

    pub fn sidedefs(&self) -> &[MSidedef] {
        &self.sidedefs
    }

    pub fn sectors(&self) -> &[MSector] {
        &self.sectors
    }

    pub fn subsecs(&self) -> &[MSubsec] {
        &self.subsecs
    }

    pub fn hedges(&self) -> &[MHEdge] {
        &self.hedges
    }

    /// Follows the `equiv` chain to the vertex that stands for this spot.
    pub fn canonical_vertex(&self, mut vertex: Handle<MVertex>) -> Handle<MVertex> {
        while let Some(next) = self.vertices[vertex.index()].equiv {
            vertex = next;
        }
        vertex
    }

    pub fn hedge_endpoints(&self, hedge: Handle<MHEdge>) -> (Point, Point) {
        let hedge = &self.hedges[hedge.index()];
        (self.vertices[hedge.start.index()].pos, self.vertices[hedge.end.index()].pos)
    }

    /// Links every vertex sharing a position with an earlier one to that
    /// earlier vertex.  Returns the number of duplicates found.
    pub fn detect_duplicate_vertices(&mut self) -> usize {
        let vertices = &self.vertices;
        let mut order: Vec<usize> = (0..vertices.len()).collect();
        order.sort_by(|&a, &b| {
            let (pa, pb) = (vertices[a].pos, vertices[b].pos);
            pa.x.partial_cmp(&pb.x).unwrap_or(Ordering::Equal)
                .then(pa.y.partial_cmp(&pb.y).unwrap_or(Ordering::Equal))
                .then(a.cmp(&b))
        });

        let mut duplicates = 0;
        let mut canonical: Option<usize> = None;
        for &index in order.iter() {
            match canonical {
                Some(first) if self.vertices[first].pos == self.vertices[index].pos => {
                    if self.vertices[index].equiv.is_none() {
                        self.vertices[index].equiv = Some(first.into());
                        duplicates += 1;
                    }
                }
                _ => canonical = Some(index),
            }
        }

        if duplicates > 0 {
            debug!("Found {} duplicate vertices", duplicates);
        }
        duplicates
    }

    /// Prunes what the finished level no longer needs: linedefs of zero
    /// length, duplicate and otherwise unreferenced vertices, and sidedefs and
    /// sectors nothing refers to any more.  Surviving elements are renumbered
    /// and every handle in the level is rewritten to match.
    pub fn clean_map(&mut self) -> CleanReport {
        // Point linedefs at canonical vertices, moving the references along
        for index in 0..self.linedefs.len() {
            let (start, end) = (self.linedefs[index].start, self.linedefs[index].end);
            let canonical_start = self.canonical_vertex(start);
            if canonical_start != start {
                self.vertices[start.index()].ref_count -= 1;
                self.vertices[canonical_start.index()].ref_count += 1;
                self.linedefs[index].start = canonical_start;
            }
            let canonical_end = self.canonical_vertex(end);
            if canonical_end != end {
                self.vertices[end.index()].ref_count -= 1;
                self.vertices[canonical_end.index()].ref_count += 1;
                self.linedefs[index].end = canonical_end;
            }
        }

        let mut keep_lines = BitVec::from_elem(self.linedefs.len(), true);
        for index in 0..self.linedefs.len() {
            if self.linedefs[index].flags.contains(LineFlags::ZEROLENGTH) {
                keep_lines.set(index, false);
                let (start, end) = (self.linedefs[index].start, self.linedefs[index].end);
                self.vertices[start.index()].ref_count -= 1;
                self.vertices[end.index()].ref_count -= 1;
            }
        }

        let mut keep_vertices = BitVec::from_elem(self.vertices.len(), false);
        for (index, vertex) in self.vertices.iter().enumerate() {
            if vertex.ref_count > 0 {
                keep_vertices.set(index, true);
            }
        }
        for hedge in self.hedges.iter() {
            keep_vertices.set(hedge.start.index(), true);
            keep_vertices.set(hedge.end.index(), true);
        }

        let mut keep_sides = BitVec::from_elem(self.sidedefs.len(), false);
        for (line, _) in self.linedefs.iter().zip(keep_lines.iter()).filter(|&(_, keep)| keep) {
            for side in line.front.iter().chain(line.back.iter()) {
                keep_sides.set(side.index(), true);
            }
        }

        let mut keep_sectors = BitVec::from_elem(self.sectors.len(), false);
        for (side, _) in self.sidedefs.iter().zip(keep_sides.iter()).filter(|&(_, keep)| keep) {
            keep_sectors.set(side.sector.index(), true);
        }
        for hedge in self.hedges.iter() {
            keep_sectors.set(hedge.sector.index(), true);
        }
        for sector in self.subsecs.iter().filter_map(|subsec| subsec.sector) {
            keep_sectors.set(sector.index(), true);
        }

        let report = CleanReport {
            vertices: compact(&mut self.vertices, &keep_vertices),
            linedefs: compact(&mut self.linedefs, &keep_lines),
            sidedefs: compact(&mut self.sidedefs, &keep_sides),
            sectors: compact(&mut self.sectors, &keep_sectors),
        };

        for (index, vertex) in self.vertices.iter_mut().enumerate() {
            vertex.index = index;
            vertex.equiv = vertex.equiv.and_then(|equiv| report.vertices[equiv.index()].map(Handle::from));
        }
        for (index, line) in self.linedefs.iter_mut().enumerate() {
            line.index = index;
            line.start = remap(&report.vertices, line.start);
            line.end = remap(&report.vertices, line.end);
            line.front = line.front.map(|side| remap(&report.sidedefs, side));
            line.back = line.back.map(|side| remap(&report.sidedefs, side));
        }
        for (index, side) in self.sidedefs.iter_mut().enumerate() {
            side.index = index;
            side.sector = remap(&report.sectors, side.sector);
        }
        for (index, sector) in self.sectors.iter_mut().enumerate() {
            sector.index = index;
        }
        for hedge in self.hedges.iter_mut() {
            hedge.start = remap(&report.vertices, hedge.start);
            hedge.end = remap(&report.vertices, hedge.end);
            hedge.linedef = hedge.linedef.map(|line| remap(&report.linedefs, line));
            hedge.sector = remap(&report.sectors, hedge.sector);
        }
        for subsec in self.subsecs.iter_mut() {
            subsec.sector = subsec.sector.map(|sector| remap(&report.sectors, sector));
        }

        info!(
            "Pruned {} vertices, {} linedefs, {} sidedefs, {} sectors",
            report.pruned_vertices(), report.pruned_linedefs(),
            report.pruned_sidedefs(), report.pruned_sectors());
        report
    }

    /// Releases all the level's arrays.
    pub fn free_map(&mut self) {
        self.vertices = Vec::new();
        self.linedefs = Vec::new();
        self.sidedefs = Vec::new();
        self.sectors = Vec::new();
        self.subsecs = Vec::new();
        self.hedges = Vec::new();
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.linedefs.is_empty() && self.sidedefs.is_empty() &&
            self.sectors.is_empty() && self.subsecs.is_empty() && self.hedges.is_empty()
    }
}

/// Drops the records not marked in `keep` and returns the old-to-new index map.
fn compact<T>(records: &mut Vec<T>, keep: &BitVec) -> Vec<Option<usize>> {
    let mut next = 0;
    let remap = keep.iter().map(|kept| {
        if kept {
            next += 1;
            Some(next - 1)
        }
        else {
            None
        }
    }).collect();

    let mut index = 0;
    records.retain(|_| {
        index += 1;
        keep[index - 1]
    });
    remap
}

fn remap<T>(table: &[Option<usize>], handle: Handle<T>) -> Handle<T> {
    match table[handle.index()] {
        Some(index) => index.into(),
        None => panic!("pruned element {:?} is still referenced", handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::test_maps;

    #[test]
    fn loading_computes_flags_and_refcounts() {
        let map = test_maps::two_rooms();
        let level = BspLevel::load_map(&map).unwrap();
        assert_eq!(level.vertices().len(), 6);
        assert_eq!(level.linedefs().len(), 7);
        assert_eq!(level.sidedefs().len(), 8);
        assert_eq!(level.sectors().len(), 2);

        let shared = level.linedefs().iter().filter(|line| line.flags.contains(LineFlags::TWOSIDED)).count();
        assert_eq!(shared, 1);
        assert!(level.linedefs().iter().all(|line| !line.flags.contains(LineFlags::SELFREF)));
        assert!(level.linedefs().iter().all(|line| !line.flags.contains(LineFlags::ZEROLENGTH)));

        // the two corners on the shared line have three lines each
        let counts: Vec<u32> = level.vertices().iter().map(|vertex| vertex.ref_count).collect();
        assert_eq!(counts, vec![2, 2, 3, 3, 2, 2]);
        assert_eq!(level.lookup_vertex(Handle::from(3)).index(), 3);
    }

    #[test]
    fn self_referencing_and_zero_length_lines() {
        let mut map = test_maps::square_room();
        let side = test_maps::add_side(&mut map, 0);
        let a = test_maps::add_vertex(&mut map, 64, 64);
        let b = test_maps::add_vertex(&mut map, 64, 128);
        test_maps::add_line(&mut map, a, b, side, side);
        test_maps::add_line(&mut map, a, a, side, -1);

        let level = BspLevel::load_map(&map).unwrap();
        let lines = level.linedefs();
        assert_eq!(lines[4].flags, LineFlags::TWOSIDED | LineFlags::SELFREF);
        assert_eq!(lines[5].flags, LineFlags::ZEROLENGTH);
    }

    #[test]
    fn bad_references_fail_to_load() {
        let mut map = test_maps::square_room();
        map.lines[2].v1 = 99;
        match BspLevel::load_map(&map) {
            Err(err) => match *err.kind() {
                ErrorKind::BadReference("LINEDEFS", 2, 99) => {}
                ref other => panic!("unexpected error: {}", other),
            },
            Ok(_) => panic!("map should not load"),
        }

        let mut map = test_maps::square_room();
        map.lines[0].front_sidedef = 7;
        assert!(BspLevel::load_map(&map).is_err());

        let mut map = test_maps::square_room();
        map.sides[0].sector = 3;
        assert!(BspLevel::load_map(&map).is_err());
    }

    #[test]
    fn factories_assign_sequential_indices() {
        let mut level = BspLevel::new();
        let a = level.new_vertex(Point::new(0.0, 0.0));
        let b = level.new_vertex(Point::new(8.0, 0.0));
        let sector = level.new_sector();
        let side = level.new_sidedef(sector);
        let line = level.new_linedef(a, b);
        level.lookup_linedef_mut(line).front = Some(side);
        let subsec = level.new_subsec();

        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(level.lookup_vertex(b).index(), 1);
        assert_eq!(level.lookup_vertex(a).ref_count, 1);
        assert_eq!(level.lookup_sidedef(side).sector, sector);
        assert_eq!(level.lookup_linedef(line).side(Facing::Front), Some(side));
        assert_eq!(level.lookup_subsec(subsec).index(), 0);
    }

    #[test]
    #[should_panic]
    fn lookup_out_of_range_panics() {
        let level = BspLevel::new();
        level.lookup_vertex(Handle::from(0));
    }

    #[test]
    fn duplicates_are_linked_and_cleaned() {
        let mut map = test_maps::square_room();
        // a second copy of corner 0, used by the last wall
        let copy = test_maps::add_vertex(&mut map, 0, 0);
        map.lines[3].v1 = copy;
        // and a vertex nothing uses
        test_maps::add_vertex(&mut map, 500, 500);

        let mut level = BspLevel::load_map(&map).unwrap();
        assert_eq!(level.detect_duplicate_vertices(), 1);
        assert_eq!(level.lookup_vertex(Handle::from(4)).equiv, Some(Handle::from(0)));
        assert_eq!(level.canonical_vertex(Handle::from(4)), Handle::from(0));
        assert_eq!(level.canonical_vertex(Handle::from(2)), Handle::from(2));

        let report = level.clean_map();
        assert_eq!(report.pruned_vertices(), 2);
        assert_eq!(report.vertices[4], None);
        assert_eq!(report.vertices[5], None);
        assert_eq!(level.vertices().len(), 4);
        assert_eq!(level.linedefs()[3].end, Handle::from(0));
        assert_eq!(level.lookup_vertex(Handle::from(0)).ref_count, 2);
    }

    #[test]
    fn cleaning_prunes_zero_length_lines_and_orphans() {
        let mut map = test_maps::square_room();
        let sector = test_maps::add_sector(&mut map);
        let side = test_maps::add_side(&mut map, sector);
        let spot = test_maps::add_vertex(&mut map, 32, 32);
        test_maps::add_line(&mut map, spot, spot, side, -1);

        let mut level = BspLevel::load_map(&map).unwrap();
        let report = level.clean_map();
        assert_eq!(report.pruned_linedefs(), 1);
        assert_eq!(report.pruned_vertices(), 1);
        assert_eq!(report.pruned_sidedefs(), 1);
        assert_eq!(report.pruned_sectors(), 1);
        assert_eq!(level.linedefs().len(), 4);
        assert_eq!(level.sidedefs().len(), 4);
        assert_eq!(level.sectors().len(), 1);
        for (index, line) in level.linedefs().iter().enumerate() {
            assert_eq!(line.index(), index);
            assert!(line.start.index() < level.vertices().len());
        }
    }

    #[test]
    fn free_releases_everything() {
        let mut level = BspLevel::load_map(&test_maps::square_room()).unwrap();
        assert!(!level.is_empty());
        level.free_map();
        assert!(level.is_empty());
    }
}
