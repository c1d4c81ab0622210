//! The finished, runtime form of a map: flat tables of geometry, the BSP tree
//! and the subsector blockmap.

use std::fmt;
use std::ops::{ControlFlow, Range};
use std::slice;

use crate::binarytree::{BinaryTree, NodeId};
use crate::blockmap::SubsectorBlockmap;
use crate::bsp::{build_nodes, BspElement, BspLevel, BuildOutput, BuildStats, Facing, MHEdge};
use crate::config::BuildConfig;
use crate::errors::{ErrorKind, Result};
use crate::geom::{bbox_of_points, BBox, BBoxExt, Coord, Point};
use crate::handle::Handle;
use crate::parse::map::{BareBinaryLine, BareBinaryMap};

/// The name of a map marker lump.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MapName {
    /// Doom 1 style, episode and mission
    ExMy(u8, u8),
    /// Doom 2 style
    MAPxx(u8),
}

impl fmt::Display for MapName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MapName::ExMy(x, y) => write!(f, "E{}M{}", x, y),
            MapName::MAPxx(xx) => write!(f, "MAP{:02}", xx),
        }
    }
}

/// Binary layout of a map's LINEDEFS (and THINGS) lumps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapFormat {
    Doom,
    Hexen,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub x: Coord,
    pub y: Coord,
}

impl Vertex {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Clone, Debug)]
pub struct Line {
    start: Handle<Vertex>,
    end: Handle<Vertex>,
    front: Option<Handle<Side>>,
    back: Option<Handle<Side>>,
    flags: u16,
    special: u16,
    tag: u16,
}

impl Line {
    pub fn vertex_indices(&self) -> (Handle<Vertex>, Handle<Vertex>) {
        (self.start, self.end)
    }

    pub fn side_indices(&self) -> (Option<Handle<Side>>, Option<Handle<Side>>) {
        (self.front, self.back)
    }

    /// The raw flags word from the map.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn special(&self) -> u16 {
        self.special
    }

    pub fn has_special(&self) -> bool {
        self.special != 0
    }

    pub fn tag(&self) -> u16 {
        self.tag
    }

    pub fn is_two_sided(&self) -> bool {
        self.front.is_some() && self.back.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct Side {
    pub sector: Handle<Sector>,
    pub x_offset: i16,
    pub y_offset: i16,
    pub upper_texture: String,
    pub lower_texture: String,
    pub middle_texture: String,
}

#[derive(Clone, Debug)]
pub struct Sector {
    pub floor_height: i16,
    pub ceiling_height: i16,
    pub floor_texture: String,
    pub ceiling_texture: String,
    pub light: i16,
    special: u16,
    tag: u16,
}

impl Sector {
    pub fn special(&self) -> u16 {
        self.special
    }

    pub fn tag(&self) -> u16 {
        self.tag
    }
}

/// A piece of a line (or of a partition, for a miniseg) bordering one
/// subsector.
#[derive(Clone, Debug)]
pub struct Seg {
    start: Handle<Vertex>,
    end: Handle<Vertex>,
    line: Option<Handle<Line>>,
    facing: Facing,
    sector: Handle<Sector>,
    partner: Option<Handle<Seg>>,
}

impl Seg {
    pub fn vertex_indices(&self) -> (Handle<Vertex>, Handle<Vertex>) {
        (self.start, self.end)
    }

    /// The line this seg runs along; `None` for a miniseg.
    pub fn line(&self) -> Option<Handle<Line>> {
        self.line
    }

    pub fn is_miniseg(&self) -> bool {
        self.line.is_none()
    }

    /// Which side of its line this seg lies on.
    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn sector(&self) -> Handle<Sector> {
        self.sector
    }

    /// The seg running the other way along the same stretch, in the
    /// neighbouring subsector.  `None` for one-sided walls, and for a side
    /// whose other half was cut at different points.
    pub fn partner(&self) -> Option<Handle<Seg>> {
        self.partner
    }
}

/// A convex region of the map: a BSP leaf.  Its segs are stored contiguously,
/// in clockwise order.
#[derive(Clone, Debug)]
pub struct Subsector {
    first_seg: usize,
    seg_count: usize,
    sector: Option<Handle<Sector>>,
    bbox: BBox,
}

impl Subsector {
    pub fn seg_range(&self) -> Range<usize> {
        self.first_seg .. self.first_seg + self.seg_count
    }

    pub fn sector(&self) -> Option<Handle<Sector>> {
        self.sector
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }
}

pub type MapBsp = BinaryTree<BspElement<Handle<Subsector>>>;

/// A fully built map.  Nothing here changes after construction except through
/// a wholesale rebuild such as [`Map::rebuild_blockmap`].
pub struct Map {
    vertices: Vec<Vertex>,
    lines: Vec<Line>,
    sides: Vec<Side>,
    sectors: Vec<Sector>,
    segs: Vec<Seg>,
    subsectors: Vec<Subsector>,
    bsp: MapBsp,
    blockmap: SubsectorBlockmap,
    bounds: BBox,
    stats: BuildStats,
}

impl Map {
    /// Runs the whole pipeline on a parsed map: load and validate, build
    /// nodes, prune, and finalize.
    pub fn from_bare<L: BareBinaryLine>(bare: &BareBinaryMap<L>, config: &BuildConfig) -> Result<Map> {
        if !(config.blockmap_cell_size > 0.0) {
            bail!(ErrorKind::InvalidCellSize(config.blockmap_cell_size));
        }
        let mut level = BspLevel::load_map(bare)?;
        if config.merge_duplicate_vertices {
            level.detect_duplicate_vertices();
        }
        let output = build_nodes(&mut level, config)?;
        if config.prune {
            level.clean_map();
        }
        let map = Map::from_level(&level, &output, config.blockmap_cell_size);
        level.free_map();

        info!(
            "Finished map: {} vertices, {} lines, {} segs, {} subsectors, {}x{} blockmap",
            map.vertices.len(), map.lines.len(), map.segs.len(), map.subsectors.len(),
            map.blockmap.width(), map.blockmap.height());
        Ok(map)
    }

    /// Copies a built level into runtime tables.  Handles in `output` must
    /// refer to `level` as it is now, i.e. after any `clean_map`.
    pub fn from_level(level: &BspLevel, output: &BuildOutput, cell_size: Coord) -> Map {
        let vertices: Vec<_> = level.vertices().iter()
            .map(|vertex| Vertex { x: vertex.pos.x, y: vertex.pos.y })
            .collect();

        let lines = level.linedefs().iter().map(|line| Line {
            start: line.start.cast(),
            end: line.end.cast(),
            front: line.front.map(Handle::cast),
            back: line.back.map(Handle::cast),
            flags: line.mapflags,
            special: line.special,
            tag: line.tag,
        }).collect();

        let sides = level.sidedefs().iter().map(|side| Side {
            sector: side.sector.cast(),
            x_offset: side.x_offset,
            y_offset: side.y_offset,
            upper_texture: side.upper_texture.clone(),
            lower_texture: side.lower_texture.clone(),
            middle_texture: side.middle_texture.clone(),
        }).collect();

        let sectors = level.sectors().iter().map(|sector| Sector {
            floor_height: sector.floor_height,
            ceiling_height: sector.ceiling_height,
            floor_texture: sector.floor_texture.clone(),
            ceiling_texture: sector.ceiling_texture.clone(),
            light: sector.light,
            special: sector.special,
            tag: sector.tag,
        }).collect();

        // Lay segs out subsector by subsector, remembering where each
        // half-edge went so twins can be turned into partners
        let mut seg_of_hedge: Vec<Option<Handle<Seg>>> = vec![None; level.hedges().len()];
        let mut hedge_order: Vec<&MHEdge> = Vec::with_capacity(level.hedges().len());
        let mut subsectors = Vec::with_capacity(level.subsecs().len());
        for subsec in level.subsecs() {
            subsectors.push(Subsector {
                first_seg: hedge_order.len(),
                seg_count: subsec.hedges.len(),
                sector: subsec.sector.map(Handle::cast),
                bbox: subsec.bbox,
            });
            for &hedge in subsec.hedges.iter() {
                seg_of_hedge[hedge.index()] = Some(hedge_order.len().into());
                hedge_order.push(level.lookup_hedge(hedge));
            }
        }
        let segs = hedge_order.into_iter().map(|hedge| Seg {
            start: hedge.start.cast(),
            end: hedge.end.cast(),
            line: hedge.linedef.map(Handle::cast),
            facing: hedge.facing,
            sector: hedge.sector.cast(),
            partner: hedge.twin
                .filter(|&twin| {
                    let twin = level.lookup_hedge(twin);
                    twin.twin.map(|back| back.index()) == Some(hedge.index()) &&
                        (twin.start, twin.end) == (hedge.end, hedge.start)
                })
                .and_then(|twin| seg_of_hedge[twin.index()]),
        }).collect();

        let bsp = output.tree.map(|element| match *element {
            BspElement::Node(node) => BspElement::Node(node),
            BspElement::Leaf(subsec) => BspElement::Leaf(subsec.cast()),
        });

        let bounds = bbox_of_points(vertices.iter().map(Vertex::point)).unwrap_or_else(BBox::zero);
        let blockmap = SubsectorBlockmap::build(
            &bounds, cell_size, subsectors.iter().enumerate().map(|(index, subsector)| (index.into(), subsector)));

        Map {
            vertices,
            lines,
            sides,
            sectors,
            segs,
            subsectors,
            bsp,
            blockmap,
            bounds,
            stats: output.stats,
        }
    }

    pub fn vertex(&self, handle: Handle<Vertex>) -> &Vertex {
        &self.vertices[handle.index()]
    }

    pub fn line(&self, handle: Handle<Line>) -> &Line {
        &self.lines[handle.index()]
    }

    pub fn side(&self, handle: Handle<Side>) -> &Side {
        &self.sides[handle.index()]
    }

    pub fn sector(&self, handle: Handle<Sector>) -> &Sector {
        &self.sectors[handle.index()]
    }

    pub fn seg(&self, handle: Handle<Seg>) -> &Seg {
        &self.segs[handle.index()]
    }

    pub fn subsector(&self, handle: Handle<Subsector>) -> &Subsector {
        &self.subsectors[handle.index()]
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn sides(&self) -> &[Side] {
        &self.sides
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn segs(&self) -> &[Seg] {
        &self.segs
    }

    pub fn subsectors(&self) -> &[Subsector] {
        &self.subsectors
    }

    pub fn iter_lines(&self) -> slice::Iter<Line> {
        self.lines.iter()
    }

    pub fn iter_subsectors(&self) -> impl Iterator<Item = (Handle<Subsector>, &Subsector)> {
        self.subsectors.iter().enumerate().map(|(index, subsector)| (index.into(), subsector))
    }

    /// The segs bounding a subsector, clockwise.
    pub fn subsector_segs(&self, handle: Handle<Subsector>) -> &[Seg] {
        &self.segs[self.subsector(handle).seg_range()]
    }

    pub fn seg_endpoints(&self, seg: &Seg) -> (Point, Point) {
        (self.vertex(seg.start).point(), self.vertex(seg.end).point())
    }

    pub fn bsp(&self) -> &MapBsp {
        &self.bsp
    }

    pub fn blockmap(&self) -> &SubsectorBlockmap {
        &self.blockmap
    }

    /// Bounding box of every vertex.
    pub fn bounds(&self) -> BBox {
        self.bounds
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Finds the subsector containing `point` by walking down the BSP.  A
    /// point outside the map still lands in some subsector near it.
    pub fn subsector_at(&self, point: Point) -> Option<Handle<Subsector>> {
        let mut node = self.bsp.root()?;
        loop {
            match *self.bsp.user_data(node) {
                BspElement::Leaf(subsector) => return Some(subsector),
                BspElement::Node(ref bsp_node) => {
                    node = if bsp_node.partition.is_front(point) {
                        self.bsp.right(node)?
                    }
                    else {
                        self.bsp.left(node)?
                    };
                }
            }
        }
    }

    /// Visits every subsector whose bounding box touches `bbox`, each once.
    pub fn subsectors_in_box<B, F>(&self, bbox: &BBox, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(Handle<Subsector>, &Subsector) -> ControlFlow<B>,
    {
        self.blockmap.subsectors_box_iterator(bbox, |handle| {
            let subsector = self.subsector(handle);
            if subsector.bbox.touches(bbox) {
                visitor(handle, subsector)
            }
            else {
                ControlFlow::Continue(())
            }
        })
    }

    /// Visits every subsector in order of distance from `viewpoint`, nearest
    /// first, the way a renderer walks the BSP.
    pub fn walk_front_to_back<B, F>(&self, viewpoint: Point, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(Handle<Subsector>, &Subsector) -> ControlFlow<B>,
    {
        match self.bsp.root() {
            Some(root) => self.walk_node(root, viewpoint, &mut visitor),
            None => ControlFlow::Continue(()),
        }
    }

    fn walk_node<B, F>(&self, node: NodeId, viewpoint: Point, visitor: &mut F) -> ControlFlow<B>
    where
        F: FnMut(Handle<Subsector>, &Subsector) -> ControlFlow<B>,
    {
        let (near, far) = match *self.bsp.user_data(node) {
            BspElement::Leaf(subsector) => return visitor(subsector, self.subsector(subsector)),
            BspElement::Node(ref bsp_node) => {
                if bsp_node.partition.is_front(viewpoint) {
                    (self.bsp.right(node), self.bsp.left(node))
                }
                else {
                    (self.bsp.left(node), self.bsp.right(node))
                }
            }
        };
        for child in near.into_iter().chain(far) {
            if let ControlFlow::Break(value) = self.walk_node(child, viewpoint, visitor) {
                return ControlFlow::Break(value);
            }
        }
        ControlFlow::Continue(())
    }

    /// Replaces the blockmap with a fresh one using a different cell size.
    /// Panics if `cell_size` is not positive.
    pub fn rebuild_blockmap(&mut self, cell_size: Coord) {
        let blockmap = SubsectorBlockmap::build(&self.bounds, cell_size, self.iter_subsectors());
        self.blockmap = blockmap;
    }
}
