//! Axis-aligned 2D KD-tree.
//!
//! Each node covers a bounding box and may carry a payload.  The tree only
//! keeps the shape; how space is split between the two children is up to the
//! caller, which passes the child's box when it creates it.

use std::ops::ControlFlow;

use crate::binarytree::{BinaryTree, ChildSide, NodeId};
use crate::geom::BBox;

#[derive(Debug)]
pub struct KdTreeNode<T> {
    bounds: BBox,
    user_data: Option<T>,
}

impl<T> KdTreeNode<T> {
    pub fn bounds(&self) -> &BBox {
        &self.bounds
    }

    pub fn user_data(&self) -> Option<&T> {
        self.user_data.as_ref()
    }
}

/// Dropping the tree drops every node payload exactly once, children before
/// their parents.
#[derive(Debug)]
pub struct KdTree<T> {
    tree: BinaryTree<KdTreeNode<T>>,
    root: NodeId,
}

impl<T> KdTree<T> {
    pub fn new(bounds: BBox, user_data: Option<T>) -> Self {
        let mut tree = BinaryTree::new();
        let root = tree.add_node(KdTreeNode { bounds, user_data });
        tree.set_root(root);
        KdTree { tree, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn bounds(&self, node: NodeId) -> &BBox {
        &self.tree.user_data(node).bounds
    }

    pub fn user_data(&self, node: NodeId) -> Option<&T> {
        self.tree.user_data(node).user_data.as_ref()
    }

    pub fn user_data_mut(&mut self, node: NodeId) -> Option<&mut T> {
        self.tree.user_data_mut(node).user_data.as_mut()
    }

    pub fn set_user_data(&mut self, node: NodeId, user_data: Option<T>) -> Option<T> {
        std::mem::replace(&mut self.tree.user_data_mut(node).user_data, user_data)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.parent(node)
    }

    pub fn child(&self, node: NodeId, left: bool) -> Option<NodeId> {
        self.tree.child(node, ChildSide::from_left(left))
    }

    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.tree.is_leaf(node)
    }

    /// Returns the requested child of `node`, creating it with `bounds` if it
    /// does not exist yet.
    ///
    /// The payload is written even when the child already exists, replacing
    /// whatever it held; the existing child keeps its original bounds.
    pub fn add_child(&mut self, node: NodeId, bounds: BBox, left: bool, user_data: Option<T>) -> NodeId {
        let side = ChildSide::from_left(left);
        match self.tree.child(node, side) {
            Some(child) => {
                self.tree.user_data_mut(child).user_data = user_data;
                child
            }
            None => self.tree.add_child(node, side, KdTreeNode { bounds, user_data }),
        }
    }

    /// Pre-order walk of the whole tree.
    pub fn traverse<B, F>(&self, visitor: F) -> ControlFlow<B>
    where
        F: FnMut(NodeId, &KdTreeNode<T>) -> ControlFlow<B>,
    {
        self.tree.pre_order(self.root, visitor)
    }

    /// Pre-order walk of the subtree under `node`.
    pub fn traverse_from<B, F>(&self, node: NodeId, visitor: F) -> ControlFlow<B>
    where
        F: FnMut(NodeId, &KdTreeNode<T>) -> ControlFlow<B>,
    {
        self.tree.pre_order(node, visitor)
    }

    pub fn post_order<B, F>(&self, visitor: F) -> ControlFlow<B>
    where
        F: FnMut(NodeId, &KdTreeNode<T>) -> ControlFlow<B>,
    {
        self.tree.post_order(self.root, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use std::cell::Cell;
    use std::rc::Rc;

    fn square(min: f64, max: f64) -> BBox {
        BBox::new(Point::new(min, min), Point::new(max, max))
    }

    #[test]
    fn add_child_reuses_existing_node() {
        let mut tree = KdTree::new(square(0.0, 64.0), Some("root"));
        let root = tree.root();
        let first = tree.add_child(root, square(0.0, 32.0), true, Some("first"));
        let second = tree.add_child(root, square(0.0, 16.0), true, Some("second"));

        assert_eq!(first, second);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.child(root, true), Some(first));
        assert_eq!(tree.child(root, false), None);
        assert_eq!(tree.parent(first), Some(root));
        // the payload is overwritten, the bounds are not
        assert_eq!(tree.user_data(first), Some(&"second"));
        assert_eq!(*tree.bounds(first), square(0.0, 32.0));
    }

    #[test]
    fn traverse_is_pre_order() {
        let mut tree = KdTree::new(square(0.0, 64.0), Some(0));
        let root = tree.root();
        let left = tree.add_child(root, square(0.0, 32.0), true, Some(1));
        tree.add_child(root, square(32.0, 64.0), false, Some(4));
        tree.add_child(left, square(0.0, 16.0), true, Some(2));
        tree.add_child(left, square(16.0, 32.0), false, Some(3));

        let mut seen = Vec::new();
        let _ = tree.traverse(|id, node| -> ControlFlow<()> {
            seen.push(*node.user_data().unwrap());
            if id != tree.root() {
                assert!(tree.parent(id).is_some());
            }
            ControlFlow::Continue(())
        });
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);

        let stopped = tree.traverse(|_, node| {
            if node.user_data() == Some(&2) { ControlFlow::Break(*node.bounds()) } else { ControlFlow::Continue(()) }
        });
        assert_eq!(stopped, ControlFlow::Break(square(0.0, 16.0)));
    }

    struct Counted(Rc<Cell<usize>>);

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn dropping_releases_every_payload_once() {
        let drops = Rc::new(Cell::new(0));
        {
            let mut tree = KdTree::new(square(0.0, 256.0), Some(Counted(drops.clone())));
            let mut node = tree.root();
            for depth in 0..4 {
                let size = 128.0 / (1 << depth) as f64;
                tree.add_child(node, square(size, size * 2.0), false, Some(Counted(drops.clone())));
                node = tree.add_child(node, square(0.0, size), true, Some(Counted(drops.clone())));
            }
            // a payload-less node
            tree.add_child(node, square(0.0, 1.0), false, None);
            assert_eq!(tree.len(), 10);
            assert_eq!(drops.get(), 0);
        }
        assert_eq!(drops.get(), 9);
    }
}
