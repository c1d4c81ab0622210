//! Recursive node building.
//!
//! Each step picks the cheapest partition line among the set's half-edges,
//! divides the set with it (splitting half-edges that cross it), closes the
//! gaps along the partition with minisegs, and recurses into both halves.  A
//! set with no usable partition is convex and becomes a subsector.

use std::time::{Duration, Instant};

use bit_vec::BitVec;

use crate::binarytree::{BinaryTree, NodeId};
use crate::config::BuildConfig;
use crate::errors::{ErrorKind, Result};
use crate::geom::{bbox_of_points, direction_angle, BBox, Point, Vector};
use crate::handle::Handle;
use super::edgetip::ANG_EPSILON;
use super::hplane::{HPlane, HPlanePartition, SegmentSide};
use super::level::{BspLevel, Facing, LineFlags, MHEdge, MSector, MSubsec, MVertex};
use super::superblock::SuperBlockmap;
use super::{BspElement, BspNode, BspTree, DIST_EPSILON};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BuildStats {
    pub nodes: usize,
    pub subsectors: usize,
    pub splits: usize,
    pub minisegs: usize,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct BuildOutput {
    pub tree: BspTree,
    pub stats: BuildStats,
}

/// What we know about one spot where the map touches the current partition.
#[derive(Clone, Copy, Debug)]
struct Intersection {
    vertex: Handle<MVertex>,
    /// Came from a linedef with the same sector on both sides.
    self_ref: bool,
    /// Sector occupying the partition just before this point, if any.
    before: Option<Handle<MSector>>,
    /// Sector occupying the partition just after this point, if any.
    after: Option<Handle<MSector>>,
}

/// Builds a BSP for `level`.  New vertices, half-edges and subsectors are
/// added to the level as the build goes.
pub fn build_nodes(level: &mut BspLevel, config: &BuildConfig) -> Result<BuildOutput> {
    let started = Instant::now();
    let mut builder = NodeBuilder {
        level,
        config,
        hplane: HPlane::new(HPlanePartition::new(Point::zero(), Vector::zero())),
        tree: BinaryTree::new(),
        stats: BuildStats::default(),
    };

    let hedges = builder.create_initial_hedges();
    if hedges.is_empty() {
        bail!(ErrorKind::DegenerateMap);
    }
    let root = builder.build_subtree(hedges);
    builder.tree.set_root(root);

    let mut stats = builder.stats;
    stats.elapsed = started.elapsed();
    info!(
        "Built BSP in {:.2?}: {} nodes, {} subsectors, {} splits, {} minisegs",
        stats.elapsed, stats.nodes, stats.subsectors, stats.splits, stats.minisegs);
    Ok(BuildOutput { tree: builder.tree, stats })
}

struct NodeBuilder<'a> {
    level: &'a mut BspLevel,
    config: &'a BuildConfig,
    hplane: HPlane<Intersection>,
    tree: BspTree,
    stats: BuildStats,
}

impl<'a> NodeBuilder<'a> {
    fn position(&self, vertex: Handle<MVertex>) -> Point {
        self.level.lookup_vertex(vertex).pos
    }

    /// One half-edge per linedef side, twinned when the line is two-sided.
    fn create_initial_hedges(&mut self) -> Vec<Handle<MHEdge>> {
        let mut hedges = Vec::new();
        for index in 0..self.level.linedefs().len() {
            let line_handle = Handle::from(index);
            let line = self.level.lookup_linedef(line_handle);
            if line.flags.contains(LineFlags::ZEROLENGTH) {
                continue;
            }
            let (front, back) = (line.front, line.back);
            let start = self.level.canonical_vertex(line.start);
            let end = self.level.canonical_vertex(line.end);
            if start == end {
                continue;
            }
            if front.is_none() {
                warn!("Linedef #{} has no front side", index);
            }

            let front_hedge = front.map(|side| {
                let sector = self.level.lookup_sidedef(side).sector;
                self.level.new_hedge(start, end, Some(line_handle), Facing::Front, sector)
            });
            let back_hedge = back.map(|side| {
                let sector = self.level.lookup_sidedef(side).sector;
                self.level.new_hedge(end, start, Some(line_handle), Facing::Back, sector)
            });
            if let (Some(front_hedge), Some(back_hedge)) = (front_hedge, back_hedge) {
                self.level.lookup_hedge_mut(front_hedge).twin = Some(back_hedge);
                self.level.lookup_hedge_mut(back_hedge).twin = Some(front_hedge);
            }

            self.add_edge_tips(start, end, front_hedge, back_hedge);
            hedges.extend(front_hedge);
            hedges.extend(back_hedge);
        }
        hedges
    }

    /// Records the tips of the edge between `start` and `end`, where
    /// `forward` runs from start to end and `backward` the other way.
    fn add_edge_tips(
        &mut self,
        start: Handle<MVertex>,
        end: Handle<MVertex>,
        forward: Option<Handle<MHEdge>>,
        backward: Option<Handle<MHEdge>>,
    ) {
        let (a, b) = (self.position(start), self.position(end));
        self.level.lookup_vertex_mut(start).tips.add(direction_angle(b - a), backward, forward, ANG_EPSILON);
        self.level.lookup_vertex_mut(end).tips.add(direction_angle(a - b), forward, backward, ANG_EPSILON);
    }

    fn build_subtree(&mut self, hedges: Vec<Handle<MHEdge>>) -> NodeId {
        let set = SuperBlockmap::from_hedges(self.level, &hedges, self.config.superblock_size);
        let partition = match self.choose_partition(&set) {
            Some(partition) => partition,
            None => return self.new_leaf(hedges),
        };

        self.hplane.clear();
        self.hplane.set_origin(partition.origin).set_direction(partition.direction);
        let (mut front, mut back) = self.divide_hedges(hedges);
        self.add_minisegs(&mut front, &mut back);
        self.hplane.clear();

        let node = BspNode {
            partition,
            right_bbox: self.hedge_bounds(&front),
            left_bbox: self.hedge_bounds(&back),
        };
        let right = self.build_subtree(front);
        let left = self.build_subtree(back);
        self.stats.nodes += 1;
        self.tree.add_node_with_children(BspElement::Node(node), Some(right), Some(left))
    }

    fn hedge_bounds(&self, hedges: &[Handle<MHEdge>]) -> BBox {
        let points = hedges.iter().flat_map(|&hedge| {
            let (start, end) = self.level.hedge_endpoints(hedge);
            vec![start, end]
        });
        bbox_of_points(points).unwrap_or_else(BBox::zero)
    }

    /// Picks the cheapest usable partition, or `None` if the set is convex.
    fn choose_partition(&self, set: &SuperBlockmap) -> Option<HPlanePartition> {
        let split_cost = u64::from(self.config.split_cost_factor);
        let mut seen_lines = BitVec::from_elem(self.level.linedefs().len(), false);
        let mut best: Option<(HPlanePartition, u64)> = None;

        for hedge in set.hedges() {
            // Every piece of a linedef gives the same line, so one is enough
            let line = match self.level.lookup_hedge(hedge).linedef {
                Some(line) => line,
                None => continue,
            };
            if seen_lines[line.index()] {
                continue;
            }
            seen_lines.set(line.index(), true);

            let (start, end) = self.level.hedge_endpoints(hedge);
            let partition = HPlanePartition::new(start, end - start);
            let limit = best.map(|(_, cost)| cost);
            if let Some(counts) = set.evaluate_partition(self.level, &partition, split_cost, limit) {
                let cost = counts.cost(split_cost);
                if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                    best = Some((partition, cost));
                }
            }
        }

        best.map(|(partition, _)| partition)
    }

    /// Sorts `hedges` to the two sides of the current partition, splitting
    /// the ones that cross it and recording every vertex that lies on it.
    fn divide_hedges(&mut self, hedges: Vec<Handle<MHEdge>>) -> (Vec<Handle<MHEdge>>, Vec<Handle<MHEdge>>) {
        let partition = *self.hplane.partition();
        let mut in_set = BitVec::from_elem(self.level.hedges().len(), false);
        for hedge in hedges.iter() {
            in_set.set(hedge.index(), true);
        }

        let mut front = Vec::new();
        let mut back = Vec::new();
        let mut pending = hedges;
        while let Some(hedge) = pending.pop() {
            let (start, end) = (self.level.lookup_hedge(hedge).start, self.level.lookup_hedge(hedge).end);
            let class = partition.classify_segment(self.position(start), self.position(end));

            match class.side {
                SegmentSide::Front | SegmentSide::Back => {
                    if class.start_on_line() {
                        self.add_intercept(start, hedge);
                    }
                    if class.end_on_line() {
                        self.add_intercept(end, hedge);
                    }
                    if class.side == SegmentSide::Front {
                        front.push(hedge);
                    }
                    else {
                        back.push(hedge);
                    }
                }
                SegmentSide::Crosses => {
                    let point = partition.intersection(self.position(start), self.position(end));
                    let joint_twin = self.level.lookup_hedge(hedge).twin
                        .map_or(false, |twin| in_set.get(twin.index()).unwrap_or(false));
                    let (second, new_twin) = self.split_hedge(hedge, point, joint_twin);
                    let middle = self.level.lookup_hedge(hedge).end;
                    self.add_intercept(middle, hedge);

                    if class.start_distance > 0.0 {
                        front.push(hedge);
                        back.push(second);
                    }
                    else {
                        back.push(hedge);
                        front.push(second);
                    }
                    // The twin itself is still waiting in `pending`
                    if let Some(new_twin) = new_twin {
                        pending.push(new_twin);
                    }
                }
            }
        }

        (front, back)
    }

    /// Splits `hedge` at `point`.  It keeps the first piece; the second piece
    /// is returned.  With `joint_twin`, the twin is split at the same new
    /// vertex and its new piece is returned too.  Otherwise the twin belongs
    /// to another set and can't be split here, so the pair is unlinked.
    fn split_hedge(
        &mut self,
        hedge: Handle<MHEdge>,
        point: Point,
        joint_twin: bool,
    ) -> (Handle<MHEdge>, Option<Handle<MHEdge>>) {
        let middle = self.level.new_vertex(point);
        let (start, end, linedef, facing, sector, twin) = {
            let hedge = self.level.lookup_hedge(hedge);
            (hedge.start, hedge.end, hedge.linedef, hedge.facing, hedge.sector, hedge.twin)
        };

        let second = self.level.new_hedge(middle, end, linedef, facing, sector);
        self.level.lookup_hedge_mut(hedge).end = middle;
        self.stats.splits += 1;

        let mut new_twin = None;
        let (first_backward, second_backward) = match twin {
            Some(twin) if joint_twin => {
                // twin ran end -> start; it keeps end -> middle
                let (twin_linedef, twin_facing, twin_sector) = {
                    let twin = self.level.lookup_hedge(twin);
                    (twin.linedef, twin.facing, twin.sector)
                };
                let twin_second = self.level.new_hedge(middle, start, twin_linedef, twin_facing, twin_sector);
                self.level.lookup_hedge_mut(twin).end = middle;

                self.level.lookup_hedge_mut(hedge).twin = Some(twin_second);
                self.level.lookup_hedge_mut(twin_second).twin = Some(hedge);
                self.level.lookup_hedge_mut(second).twin = Some(twin);
                self.level.lookup_hedge_mut(twin).twin = Some(second);

                new_twin = Some(twin_second);
                (Some(twin_second), Some(twin))
            }
            _ => {
                // Whatever lay across the whole edge still lies across both pieces
                let across = self.hedge_across(start, hedge).or(twin);
                self.level.lookup_hedge_mut(hedge).twin = None;
                if let Some(twin) = twin {
                    let twin = self.level.lookup_hedge_mut(twin);
                    if twin.twin == Some(hedge) {
                        twin.twin = None;
                    }
                }
                (across, across)
            }
        };

        if let Some(twin) = new_twin.and(twin) {
            self.level.lookup_vertex_mut(start).tips.clear_by_line_segment(twin);
            self.level.lookup_vertex_mut(end).tips.clear_by_line_segment(twin);
        }
        self.level.lookup_vertex_mut(start).tips.clear_by_line_segment(hedge);
        self.level.lookup_vertex_mut(end).tips.clear_by_line_segment(hedge);
        self.add_edge_tips(start, middle, Some(hedge), first_backward);
        self.add_edge_tips(middle, end, Some(second), second_backward);

        (second, new_twin)
    }

    /// The half-edge recorded on the far side of `hedge`, which leaves `vertex`.
    fn hedge_across(&self, vertex: Handle<MVertex>, hedge: Handle<MHEdge>) -> Option<Handle<MHEdge>> {
        self.level.lookup_vertex(vertex).tips.iter()
            .find(|tip| tip.back_opt() == Some(hedge))
            .and_then(|tip| tip.front_opt())
    }

    fn add_intercept(&mut self, vertex: Handle<MVertex>, hedge: Handle<MHEdge>) {
        if self.hplane.iter().any(|intercept| intercept.user_data().vertex == vertex) {
            return;
        }
        let self_ref = self.level.lookup_hedge(hedge).linedef
            .map_or(false, |line| self.level.lookup_linedef(line).flags.contains(LineFlags::SELFREF));
        let distance = self.hplane.partition().parallel_distance(self.position(vertex));
        self.hplane.new_intercept(distance, Intersection {
            vertex,
            self_ref,
            before: None,
            after: None,
        });
    }

    /// Sector in direction `angle` from `vertex`, if that direction leads into
    /// open space.
    fn open_sector(&self, vertex: Handle<MVertex>, angle: f64) -> Option<Handle<MSector>> {
        self.level.lookup_vertex(vertex).tips.open_at(angle, ANG_EPSILON)
            .map(|hedge| self.level.lookup_hedge(hedge).sector)
    }

    /// Closes the gaps along the partition: wherever open space runs between
    /// two consecutive intercepts, a pair of minisegs is added, the one
    /// running along the partition to the front.
    fn add_minisegs(&mut self, front: &mut Vec<Handle<MHEdge>>, back: &mut Vec<Handle<MHEdge>>) {
        let direction = self.hplane.direction();
        let forward = direction_angle(direction);
        let backward = direction_angle(-direction);
        for index in 0..self.hplane.len() {
            let vertex = self.hplane.intercepts()[index].user_data().vertex;
            let before = self.open_sector(vertex, backward);
            let after = self.open_sector(vertex, forward);
            let cut = self.hplane.intercept_mut(index).user_data_mut();
            cut.before = before;
            cut.after = after;
        }

        self.merge_intercepts();

        let cuts: Vec<Intersection> = self.hplane.iter().map(|intercept| *intercept.user_data()).collect();
        for pair in cuts.windows(2) {
            let (cur, next) = (pair[0], pair[1]);
            match (cur.after, next.before) {
                (None, None) => {}
                (Some(sector), Some(next_sector)) => {
                    if sector != next_sector {
                        let pos = self.position(cur.vertex);
                        warn!(
                            "Sector mismatch between #{} and #{} near ({}, {})",
                            sector, next_sector, pos.x, pos.y);
                    }
                    let (miniseg, buddy) = self.new_miniseg_pair(cur.vertex, next.vertex, sector);
                    front.push(miniseg);
                    back.push(buddy);
                }
                (Some(sector), None) | (None, Some(sector)) => {
                    let pos = self.position(if cur.after.is_some() { cur.vertex } else { next.vertex });
                    warn!("Sector #{} is not closed near ({}, {})", sector, pos.x, pos.y);
                }
            }
        }
    }

    /// Folds together intercepts closer than `DIST_EPSILON`.
    fn merge_intercepts(&mut self) {
        let mut index = 0;
        while index + 1 < self.hplane.len() {
            let gap = self.hplane.intercepts()[index + 1].distance() - self.hplane.intercepts()[index].distance();
            if gap >= DIST_EPSILON {
                index += 1;
                continue;
            }

            let next = self.hplane.delete_intercept(index + 1).into_user_data();
            let cur = self.hplane.intercept_mut(index).user_data_mut();
            if cur.self_ref && !next.self_ref {
                if cur.before.is_some() && next.before.is_some() {
                    cur.before = next.before;
                }
                if cur.after.is_some() && next.after.is_some() {
                    cur.after = next.after;
                }
                cur.self_ref = false;
            }
            if cur.before.is_none() {
                cur.before = next.before;
            }
            if cur.after.is_none() {
                cur.after = next.after;
            }
        }
    }

    fn new_miniseg_pair(
        &mut self,
        start: Handle<MVertex>,
        end: Handle<MVertex>,
        sector: Handle<MSector>,
    ) -> (Handle<MHEdge>, Handle<MHEdge>) {
        let miniseg = self.level.new_hedge(start, end, None, Facing::Front, sector);
        let buddy = self.level.new_hedge(end, start, None, Facing::Back, sector);
        self.level.lookup_hedge_mut(miniseg).twin = Some(buddy);
        self.level.lookup_hedge_mut(buddy).twin = Some(miniseg);
        self.add_edge_tips(start, end, Some(miniseg), Some(buddy));
        self.stats.minisegs += 1;
        (miniseg, buddy)
    }

    fn new_leaf(&mut self, mut hedges: Vec<Handle<MHEdge>>) -> NodeId {
        // Clockwise around the middle
        let starts: Vec<Point> = hedges.iter().map(|&hedge| self.level.hedge_endpoints(hedge).0).collect();
        let count = starts.len().max(1) as f64;
        let sum = starts.iter().fold(Vector::zero(), |sum, point| sum + point.to_vector());
        let centre = (sum / count).to_point();
        hedges.sort_by(|&a, &b| {
            let angle_a = direction_angle(self.level.hedge_endpoints(a).0 - centre);
            let angle_b = direction_angle(self.level.hedge_endpoints(b).0 - centre);
            angle_b.partial_cmp(&angle_a).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut sector = None;
        for &hedge in hedges.iter() {
            let hedge = self.level.lookup_hedge(hedge);
            if hedge.is_miniseg() {
                continue;
            }
            match sector {
                None => sector = Some(hedge.sector),
                Some(first) if first != hedge.sector => {
                    let (start, _) = self.level.hedge_endpoints(Handle::from(hedge.index()));
                    warn!(
                        "Subsector near ({}, {}) touches sectors #{} and #{}",
                        start.x, start.y, first, hedge.sector);
                }
                Some(_) => {}
            }
        }

        let bbox = self.hedge_bounds(&hedges);
        let subsec: Handle<MSubsec> = self.level.new_subsec();
        let record = self.level.lookup_subsec_mut(subsec);
        record.hedges = hedges;
        record.sector = sector;
        record.bbox = bbox;

        self.stats.subsectors += 1;
        self.tree.add_node(BspElement::Leaf(subsec))
    }
}
