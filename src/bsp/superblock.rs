//! Spatial bucketing of half-edges, so partition candidates can be scored
//! without looking at every half-edge individually.
//!
//! A superblockmap is a KD-tree over the bounds of a set of half-edges.  Each
//! block is halved along its longer axis until it is no bigger than the block
//! size; a half-edge lives in the smallest block that contains it entirely.
//! Every block also counts all the half-edges in its subtree, so a block lying
//! wholly on one side of a partition is scored in one step.

use std::ops::ControlFlow;

use crate::binarytree::NodeId;
use crate::geom::{bbox_of_points, BBox, Coord, Point};
use crate::handle::Handle;
use crate::kdtree::KdTree;
use super::hplane::{HPlanePartition, SegmentSide};
use super::level::{BspLevel, MHEdge};

#[derive(Debug, Default)]
pub struct SuperBlock {
    hedges: Vec<Handle<MHEdge>>,
    real_num: usize,
    mini_num: usize,
}

impl SuperBlock {
    pub fn hedges(&self) -> &[Handle<MHEdge>] {
        &self.hedges
    }

    /// Half-edges belonging to a linedef, in this block and all below it.
    pub fn real_num(&self) -> usize {
        self.real_num
    }

    /// Minisegs in this block and all below it.
    pub fn mini_num(&self) -> usize {
        self.mini_num
    }

    pub fn total(&self) -> usize {
        self.real_num + self.mini_num
    }
}

/// Tallies of where half-edges fall relative to a candidate partition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PartitionCounts {
    pub front_real: usize,
    pub front_mini: usize,
    pub back_real: usize,
    pub back_mini: usize,
    pub splits: usize,
}

impl PartitionCounts {
    pub fn cost(&self, split_cost: u64) -> u64 {
        let imbalance = (self.front_real as i64 - self.back_real as i64).abs() as u64;
        self.splits as u64 * split_cost + imbalance
    }

    fn add_block(&mut self, side: SegmentSide, block: &SuperBlock) {
        match side {
            SegmentSide::Front => {
                self.front_real += block.real_num;
                self.front_mini += block.mini_num;
            }
            SegmentSide::Back => {
                self.back_real += block.real_num;
                self.back_mini += block.mini_num;
            }
            SegmentSide::Crosses => {}
        }
    }

    fn add_hedge(&mut self, side: SegmentSide, real: bool) {
        let (front, back) = match side {
            SegmentSide::Front => (1, 0),
            SegmentSide::Back => (0, 1),
            SegmentSide::Crosses => {
                self.splits += 1;
                (1, 1)
            }
        };
        if real {
            self.front_real += front;
            self.back_real += back;
        }
        else {
            self.front_mini += front;
            self.back_mini += back;
        }
    }
}

#[derive(Debug)]
pub struct SuperBlockmap {
    tree: KdTree<SuperBlock>,
    block_size: Coord,
}

impl SuperBlockmap {
    pub fn new(bounds: BBox, block_size: Coord) -> Self {
        SuperBlockmap {
            tree: KdTree::new(bounds, Some(SuperBlock::default())),
            block_size,
        }
    }

    /// Builds a blockmap just large enough for `hedges` and fills it.
    pub fn from_hedges(level: &BspLevel, hedges: &[Handle<MHEdge>], block_size: Coord) -> Self {
        let points = hedges.iter().flat_map(|&hedge| {
            let (start, end) = level.hedge_endpoints(hedge);
            vec![start, end]
        });
        let bounds = match bbox_of_points(points) {
            Some(bbox) => BBox::new(
                Point::new(bbox.min.x.floor(), bbox.min.y.floor()),
                Point::new(bbox.max.x.ceil(), bbox.max.y.ceil())),
            None => BBox::zero(),
        };

        let mut blockmap = SuperBlockmap::new(bounds, block_size);
        for &hedge in hedges.iter() {
            blockmap.insert(level, hedge);
        }
        blockmap
    }

    pub fn bounds(&self) -> &BBox {
        self.tree.bounds(self.tree.root())
    }

    fn root_block(&self) -> Option<&SuperBlock> {
        self.tree.user_data(self.tree.root())
    }

    pub fn len(&self) -> usize {
        self.root_block().map_or(0, SuperBlock::total)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn real_num(&self) -> usize {
        self.root_block().map_or(0, SuperBlock::real_num)
    }

    pub fn insert(&mut self, level: &BspLevel, hedge: Handle<MHEdge>) {
        let (start, end) = level.hedge_endpoints(hedge);
        let real = !level.lookup_hedge(hedge).is_miniseg();

        let mut node = self.tree.root();
        loop {
            if let Some(block) = self.tree.user_data_mut(node) {
                if real {
                    block.real_num += 1;
                }
                else {
                    block.mini_num += 1;
                }
            }

            let bounds = *self.tree.bounds(node);
            let (width, height) = (bounds.width(), bounds.height());
            if width <= self.block_size && height <= self.block_size {
                break;
            }

            let (left_bounds, right_bounds, fits_left, fits_right);
            if width >= height {
                let mid = bounds.min.x + (width / 2.0).floor();
                left_bounds = BBox::new(bounds.min, Point::new(mid, bounds.max.y));
                right_bounds = BBox::new(Point::new(mid, bounds.min.y), bounds.max);
                fits_left = start.x <= mid && end.x <= mid;
                fits_right = start.x >= mid && end.x >= mid;
            }
            else {
                let mid = bounds.min.y + (height / 2.0).floor();
                left_bounds = BBox::new(bounds.min, Point::new(bounds.max.x, mid));
                right_bounds = BBox::new(Point::new(bounds.min.x, mid), bounds.max);
                fits_left = start.y <= mid && end.y <= mid;
                fits_right = start.y >= mid && end.y >= mid;
            }

            let (left, child_bounds) = if fits_left {
                (true, left_bounds)
            }
            else if fits_right {
                (false, right_bounds)
            }
            else {
                // Straddles the midline, so it stays here
                break;
            };
            node = match self.tree.child(node, left) {
                Some(child) => child,
                None => self.tree.add_child(node, child_bounds, left, Some(SuperBlock::default())),
            };
        }

        if let Some(block) = self.tree.user_data_mut(node) {
            block.hedges.push(hedge);
        }
    }

    /// Every half-edge in the blockmap, in pre-order block order.
    pub fn hedges(&self) -> Vec<Handle<MHEdge>> {
        let mut hedges = Vec::with_capacity(self.len());
        let _ = self.tree.traverse(|_, node| -> ControlFlow<()> {
            if let Some(block) = node.user_data() {
                hedges.extend_from_slice(&block.hedges);
            }
            ControlFlow::Continue(())
        });
        hedges
    }

    /// Scores `partition` as a split for this set of half-edges.
    ///
    /// Returns `None` when the partition is unusable, meaning it leaves no real
    /// half-edge on one of its sides, or when its cost is already known to
    /// exceed `best`.
    pub fn evaluate_partition(
        &self,
        level: &BspLevel,
        partition: &HPlanePartition,
        split_cost: u64,
        best: Option<u64>,
    ) -> Option<PartitionCounts> {
        let mut counts = PartitionCounts::default();
        let flow = self.evaluate_block(self.tree.root(), level, partition, split_cost, best, &mut counts);
        if flow.is_break() || counts.front_real == 0 || counts.back_real == 0 {
            return None;
        }
        Some(counts)
    }

    fn evaluate_block(
        &self,
        node: NodeId,
        level: &BspLevel,
        partition: &HPlanePartition,
        split_cost: u64,
        best: Option<u64>,
        counts: &mut PartitionCounts,
    ) -> ControlFlow<()> {
        let block = match self.tree.user_data(node) {
            Some(block) => block,
            None => return ControlFlow::Continue(()),
        };

        let side = partition.box_side(self.tree.bounds(node));
        if side != SegmentSide::Crosses {
            counts.add_block(side, block);
            return ControlFlow::Continue(());
        }

        for &hedge in block.hedges.iter() {
            let (start, end) = level.hedge_endpoints(hedge);
            let class = partition.classify_segment(start, end);
            counts.add_hedge(class.side, !level.lookup_hedge(hedge).is_miniseg());
        }
        if let Some(best) = best {
            if counts.cost(split_cost) > best {
                return ControlFlow::Break(());
            }
        }

        for &left in [true, false].iter() {
            if let Some(child) = self.tree.child(node, left) {
                if let ControlFlow::Break(()) = self.evaluate_block(child, level, partition, split_cost, best, counts) {
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::level::Facing;
    use crate::geom::Vector;

    // A row of short horizontal half-edges spread across 1024 units
    fn spread_level() -> (BspLevel, Vec<Handle<MHEdge>>) {
        let mut level = BspLevel::new();
        let sector = level.new_sector();
        let mut hedges = Vec::new();
        for i in 0..8 {
            let x = i as f64 * 128.0;
            let a = level.new_vertex(Point::new(x + 16.0, 0.0));
            let b = level.new_vertex(Point::new(x + 48.0, 0.0));
            let line = level.new_linedef(a, b);
            hedges.push(level.new_hedge(a, b, Some(line), Facing::Front, sector));
        }
        // one long miniseg spanning all of them
        let a = level.new_vertex(Point::new(0.0, 64.0));
        let b = level.new_vertex(Point::new(1024.0, 64.0));
        hedges.push(level.new_hedge(b, a, None, Facing::Front, sector));
        (level, hedges)
    }

    #[test]
    fn hedges_sink_to_small_blocks() {
        let (level, hedges) = spread_level();
        let blockmap = SuperBlockmap::from_hedges(&level, &hedges, 256.0);
        assert_eq!(blockmap.len(), 9);
        assert_eq!(blockmap.real_num(), 8);
        assert_eq!(*blockmap.bounds(), BBox::new(Point::new(0.0, 0.0), Point::new(1024.0, 64.0)));

        // the miniseg straddles the first midline and stays at the root
        let root = blockmap.tree.root();
        assert_eq!(blockmap.tree.user_data(root).unwrap().hedges(), &[hedges[8]]);

        let mut all = blockmap.hedges();
        all.sort();
        assert_eq!(all, hedges);
    }

    #[test]
    fn partition_scoring() {
        let (level, hedges) = spread_level();
        let blockmap = SuperBlockmap::from_hedges(&level, &hedges, 256.0);

        // vertical line at x = 320: three short hedges behind it, five in front,
        // and the long miniseg crossing it
        let partition = HPlanePartition::new(Point::new(320.0, 0.0), Vector::new(0.0, 1.0));
        let counts = blockmap.evaluate_partition(&level, &partition, 7, None).unwrap();
        assert_eq!(counts.splits, 1);
        assert_eq!(counts.front_real, 5);
        assert_eq!(counts.back_real, 3);
        assert_eq!(counts.front_mini, 1);
        assert_eq!(counts.back_mini, 1);
        assert_eq!(counts.cost(7), 9);

        // a cheaper candidate is already known
        assert_eq!(blockmap.evaluate_partition(&level, &partition, 7, Some(2)), None);

        // a line with everything on one side is useless
        let partition = HPlanePartition::new(Point::new(0.0, 100.0), Vector::new(1.0, 0.0));
        assert_eq!(blockmap.evaluate_partition(&level, &partition, 7, None), None);
    }
}
