//! BSP node building.
//!
//! The builder works on a [`BspLevel`], recursively cutting the level's
//! half-edges with partition lines until every set left over is convex.  The
//! result is a [`BinaryTree`] whose inner nodes hold the partitions and whose
//! leaves hold subsectors.

pub mod builder;
pub mod edgetip;
pub mod hplane;
pub mod level;
pub mod superblock;

use crate::binarytree::BinaryTree;
use crate::geom::BBox;
use crate::handle::Handle;

pub use self::builder::{build_nodes, BuildOutput, BuildStats};
pub use self::edgetip::{EdgeTip, EdgeTips, ANG_EPSILON};
pub use self::hplane::{HPlane, HPlaneIntercept, HPlanePartition};
pub use self::level::{BspLevel, CleanReport, Facing, LineFlags, MHEdge, MLinedef, MSector, MSidedef, MSubsec, MVertex};

/// Distances smaller than this are treated as zero.
pub const DIST_EPSILON: f64 = 1.0 / 128.0;

/// An inner node of the BSP: the partition line, plus the bounds of what lies
/// on either side of it.  Right is the front.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BspNode {
    pub partition: HPlanePartition,
    pub right_bbox: BBox,
    pub left_bbox: BBox,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BspElement<L> {
    Node(BspNode),
    Leaf(L),
}

pub type BspTree = BinaryTree<BspElement<Handle<MSubsec>>>;
