//! A generic binary tree stored in an arena.
//!
//! Every node owns its two child slots and keeps a non-owning reference to its
//! parent.  Nodes are addressed by [`NodeId`], which stays valid for as long as
//! the tree does; nodes are never removed individually.
//!
//! Traversals take a visitor returning [`ControlFlow`].  Returning
//! `ControlFlow::Break(value)` stops the walk immediately and the value is
//! handed back to the caller.

use std::ops::ControlFlow;

/// Index of a node inside a [`BinaryTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One of the two child slots of a node.  In a BSP tree, `Right` holds the
/// front half-space and `Left` the back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChildSide {
    Right,
    Left,
}

impl ChildSide {
    pub fn from_left(left: bool) -> ChildSide {
        if left { ChildSide::Left } else { ChildSide::Right }
    }

    pub fn opposite(self) -> ChildSide {
        match self {
            ChildSide::Right => ChildSide::Left,
            ChildSide::Left => ChildSide::Right,
        }
    }

    fn slot(self) -> usize {
        match self {
            ChildSide::Right => 0,
            ChildSide::Left => 1,
        }
    }
}

#[derive(Debug)]
struct Node<T> {
    parent: Option<NodeId>,
    children: [Option<NodeId>; 2],
    user_data: T,
}

#[derive(Debug)]
pub struct BinaryTree<T> {
    nodes: Vec<Node<T>>,
    root: Option<NodeId>,
}

impl<T> Default for BinaryTree<T> {
    fn default() -> Self {
        BinaryTree::new()
    }
}

impl<T> BinaryTree<T> {
    pub fn new() -> Self {
        BinaryTree {
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Creates a tree holding a single node, which becomes the root.
    pub fn with_root(user_data: T) -> Self {
        let mut tree = BinaryTree::new();
        let root = tree.add_node(user_data);
        tree.root = Some(root);
        tree
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, node: NodeId) {
        debug_assert!(self.nodes[node.0].parent.is_none(), "the root cannot have a parent");
        self.root = Some(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a detached node with no parent and no children.
    pub fn add_node(&mut self, user_data: T) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: [None, None],
            user_data,
        });
        id
    }

    /// Adds a node adopting two existing detached subtrees.
    pub fn add_node_with_children(&mut self, user_data: T, right: Option<NodeId>, left: Option<NodeId>) -> NodeId {
        let id = self.add_node(user_data);
        self.set_child(id, ChildSide::Right, right);
        self.set_child(id, ChildSide::Left, left);
        id
    }

    /// Adds a leaf under `parent`.  The slot must be empty.
    pub fn add_child(&mut self, parent: NodeId, side: ChildSide, user_data: T) -> NodeId {
        assert!(self.child(parent, side).is_none(), "{:?} child of {:?} is already occupied", side, parent);
        let id = self.add_node(user_data);
        self.set_child(parent, side, Some(id));
        id
    }

    /// Replaces a child slot.  A child previously in the slot becomes detached;
    /// the new child's parent is updated.
    pub fn set_child(&mut self, parent: NodeId, side: ChildSide, child: Option<NodeId>) {
        if let Some(old) = self.nodes[parent.0].children[side.slot()] {
            self.nodes[old.0].parent = None;
        }
        if let Some(child) = child {
            debug_assert!(child != parent);
            debug_assert!(self.nodes[child.0].parent.is_none(), "{:?} already has a parent", child);
            self.nodes[child.0].parent = Some(parent);
        }
        self.nodes[parent.0].children[side.slot()] = child;
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn child(&self, node: NodeId, side: ChildSide) -> Option<NodeId> {
        self.nodes[node.0].children[side.slot()]
    }

    pub fn right(&self, node: NodeId) -> Option<NodeId> {
        self.child(node, ChildSide::Right)
    }

    pub fn left(&self, node: NodeId) -> Option<NodeId> {
        self.child(node, ChildSide::Left)
    }

    pub fn has_right(&self, node: NodeId) -> bool {
        self.right(node).is_some()
    }

    pub fn has_left(&self, node: NodeId) -> bool {
        self.left(node).is_some()
    }

    pub fn user_data(&self, node: NodeId) -> &T {
        &self.nodes[node.0].user_data
    }

    pub fn user_data_mut(&mut self, node: NodeId) -> &mut T {
        &mut self.nodes[node.0].user_data
    }

    /// Replaces a node's payload, returning the old one.
    pub fn set_user_data(&mut self, node: NodeId, user_data: T) -> T {
        std::mem::replace(&mut self.nodes[node.0].user_data, user_data)
    }

    pub fn is_leaf(&self, node: NodeId) -> bool {
        let children = &self.nodes[node.0].children;
        children[0].is_none() && children[1].is_none()
    }

    /// Length of the longest path from `node` down to a leaf; 0 for a leaf.
    pub fn height(&self, node: NodeId) -> usize {
        if self.is_leaf(node) {
            return 0;
        }
        let right = self.right(node).map_or(0, |child| self.height(child));
        let left = self.left(node).map_or(0, |child| self.height(child));
        1 + right.max(left)
    }

    /// Visits `node`, then its left subtree, then its right subtree.
    pub fn pre_order<B, F>(&self, node: NodeId, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(NodeId, &T) -> ControlFlow<B>,
    {
        self.walk_pre_order(node, &mut visitor)
    }

    /// Visits the left subtree, then `node`, then the right subtree.
    pub fn in_order<B, F>(&self, node: NodeId, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(NodeId, &T) -> ControlFlow<B>,
    {
        self.walk_in_order(node, &mut visitor)
    }

    /// Visits the left subtree, then the right subtree, then `node`.
    pub fn post_order<B, F>(&self, node: NodeId, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(NodeId, &T) -> ControlFlow<B>,
    {
        self.walk_post_order(node, &mut visitor)
    }

    fn walk_pre_order<B, F>(&self, node: NodeId, visitor: &mut F) -> ControlFlow<B>
    where
        F: FnMut(NodeId, &T) -> ControlFlow<B>,
    {
        if let ControlFlow::Break(value) = visitor(node, self.user_data(node)) {
            return ControlFlow::Break(value);
        }
        for &child in self.nodes[node.0].children.iter().rev().flatten() {
            if let ControlFlow::Break(value) = self.walk_pre_order(child, visitor) {
                return ControlFlow::Break(value);
            }
        }
        ControlFlow::Continue(())
    }

    fn walk_in_order<B, F>(&self, node: NodeId, visitor: &mut F) -> ControlFlow<B>
    where
        F: FnMut(NodeId, &T) -> ControlFlow<B>,
    {
        if let Some(left) = self.left(node) {
            if let ControlFlow::Break(value) = self.walk_in_order(left, visitor) {
                return ControlFlow::Break(value);
            }
        }
        if let ControlFlow::Break(value) = visitor(node, self.user_data(node)) {
            return ControlFlow::Break(value);
        }
        match self.right(node) {
            Some(right) => self.walk_in_order(right, visitor),
            None => ControlFlow::Continue(()),
        }
    }

    fn walk_post_order<B, F>(&self, node: NodeId, visitor: &mut F) -> ControlFlow<B>
    where
        F: FnMut(NodeId, &T) -> ControlFlow<B>,
    {
        for &child in self.nodes[node.0].children.iter().rev().flatten() {
            if let ControlFlow::Break(value) = self.walk_post_order(child, visitor) {
                return ControlFlow::Break(value);
            }
        }
        visitor(node, self.user_data(node))
    }

    /// Builds a tree of the same shape with every payload transformed by `f`.
    /// Node ids carry over unchanged.
    pub fn map<U, F>(&self, mut f: F) -> BinaryTree<U>
    where
        F: FnMut(&T) -> U,
    {
        BinaryTree {
            nodes: self.nodes.iter().map(|node| Node {
                parent: node.parent,
                children: node.children,
                user_data: f(&node.user_data),
            }).collect(),
            root: self.root,
        }
    }

    fn collect_post_order(&self, node: NodeId, order: &mut Vec<NodeId>) {
        for &child in self.nodes[node.0].children.iter().rev().flatten() {
            self.collect_post_order(child, order);
        }
        order.push(node);
    }
}

/// Payloads are released in post-order: every node's children go before the
/// node itself.  Detached nodes are released as roots of their own subtrees.
impl<T> Drop for BinaryTree<T> {
    fn drop(&mut self) {
        let mut order = Vec::with_capacity(self.nodes.len());
        for (index, node) in self.nodes.iter().enumerate() {
            if node.parent.is_none() {
                self.collect_post_order(NodeId(index), &mut order);
            }
        }

        let mut slots: Vec<Option<Node<T>>> = self.nodes.drain(..).map(Some).collect();
        for node in order {
            drop(slots[node.0].take());
        }
    }
}
