use std::ops::{Index, IndexMut};

use slotmap::SlotMap;

use super::con::{Con, ConType};
use crate::layout_engine::Position;

/// Arena of containers.
///
/// Structure is kept in three ordered sequences per container: tiling
/// children, floating children and the focus order (most recently focused
/// first) over both. Attributes are reached through `tree[id]`.
pub struct Tree<O> {
    pub map: ConMap,
    pub data: O,
}

impl Tree<()> {
    pub fn new() -> Self { Self::with_observer(()) }
}

impl<O: Observer> Tree<O> {
    pub fn with_observer(data: O) -> Self { Tree { map: ConMap::new(), data } }

    /// Creates a detached container.
    pub fn mk_con(&mut self, con: Con) -> ConId {
        let id = self.map.map.insert(Node::new(con));
        self.data.added_to_forest(&self.map, id);
        id
    }

    /// Links a detached container under `parent`.
    ///
    /// Floating wrappers go to the floating list, everything else to the tiling
    /// list. The container is always appended to the tail of the parent's
    /// focus order.
    #[track_caller]
    pub fn link(&mut self, id: ConId, parent: ConId, at: InsertAt) {
        assert!(
            self.map.node(id).parent.is_none(),
            "linking {id:?} which is still attached to {:?}",
            self.map.node(id).parent
        );
        assert_ne!(id, parent, "cannot link a container under itself");
        let floating = self.map[id].kind == ConType::FloatingCon;
        let node = self.map.node_mut(parent);
        let list = if floating { &mut node.floating_nodes } else { &mut node.nodes };
        let idx = match at {
            InsertAt::Back => list.len(),
            InsertAt::Front => 0,
            InsertAt::Sibling(sibling, position) => {
                let i = list
                    .iter()
                    .position(|&c| c == sibling)
                    .unwrap_or_else(|| panic!("{sibling:?} is not a child of {parent:?}"));
                match position {
                    Position::Before => i,
                    Position::After => i + 1,
                }
            }
        };
        list.insert(idx, id);
        node.focus.push(id);
        self.map.node_mut(id).parent = Some(parent);
    }

    /// Removes a container from its parent's structural and focus sequences.
    ///
    /// Percentages of the remaining siblings are left untouched.
    #[track_caller]
    pub fn unlink(&mut self, id: ConId) {
        let Some(parent) = self.map.node(id).parent else {
            return;
        };
        let node = self.map.node_mut(parent);
        node.nodes.retain(|&c| c != id);
        node.floating_nodes.retain(|&c| c != id);
        node.focus.retain(|&c| c != id);
        self.map.node_mut(id).parent = None;
    }

    /// Deletes a detached, childless container.
    #[track_caller]
    pub fn remove(&mut self, id: ConId) -> Con {
        let node = self.map.node(id);
        assert!(node.parent.is_none(), "removing {id:?} while still attached");
        assert!(
            node.nodes.is_empty() && node.floating_nodes.is_empty(),
            "removing {id:?} which still has children"
        );
        self.data.removed_from_forest(&self.map, id);
        self.map.map.remove(id).map(|n| n.con).expect("node vanished during removal")
    }

    /// Moves `id` to the head of its parent's focus order.
    pub fn focus_front(&mut self, id: ConId) {
        let Some(parent) = id.parent(&self.map) else {
            return;
        };
        let focus = &mut self.map.node_mut(parent).focus;
        if let Some(i) = focus.iter().position(|&c| c == id) {
            focus.remove(i);
        }
        focus.insert(0, id);
    }

    /// Puts the detached `new` in `old`'s place in both sequences of the
    /// parent, leaving `old` detached.
    #[track_caller]
    pub fn replace(&mut self, old: ConId, new: ConId) {
        assert!(self.map.node(new).parent.is_none(), "replacement {new:?} is attached");
        let parent = old.parent(&self.map).expect("replacing a container without a parent");
        let node = self.map.node_mut(parent);
        for slot in node.nodes.iter_mut().chain(node.floating_nodes.iter_mut()) {
            if *slot == old {
                *slot = new;
            }
        }
        for slot in node.focus.iter_mut() {
            if *slot == old {
                *slot = new;
            }
        }
        self.map.node_mut(new).parent = Some(parent);
        self.map.node_mut(old).parent = None;
    }

    /// Exchanges the positions of two containers, which may have different
    /// parents. Neither may be an ancestor of the other.
    #[track_caller]
    pub fn swap(&mut self, a: ConId, b: ConId) {
        if a == b {
            return;
        }
        assert!(
            !a.ancestors(&self.map).any(|x| x == b) && !b.ancestors(&self.map).any(|x| x == a),
            "cannot swap {a:?} with its own ancestor or descendant"
        );
        let pa = a.parent(&self.map).expect("swapping a root");
        let pb = b.parent(&self.map).expect("swapping a root");
        let exchange = |list: &mut Vec<ConId>| {
            for slot in list.iter_mut() {
                if *slot == a {
                    *slot = b;
                } else if *slot == b {
                    *slot = a;
                }
            }
        };
        for parent in [pa, pb] {
            let node = self.map.node_mut(parent);
            exchange(&mut node.nodes);
            exchange(&mut node.floating_nodes);
            exchange(&mut node.focus);
            if pa == pb {
                break;
            }
        }
        self.map.node_mut(a).parent = Some(pb);
        self.map.node_mut(b).parent = Some(pa);
    }

    /// Replaces the focus order of `parent`. `order` must be a permutation of
    /// its current children.
    #[track_caller]
    pub fn set_focus_order(&mut self, parent: ConId, order: Vec<ConId>) {
        let node = self.map.node_mut(parent);
        let mut current = node.focus.clone();
        let mut wanted = order.clone();
        current.sort();
        wanted.sort();
        assert_eq!(current, wanted, "focus order of {parent:?} must keep the same children");
        node.focus = order;
    }
}

impl<O> Index<ConId> for Tree<O> {
    type Output = Con;

    #[track_caller]
    fn index(&self, id: ConId) -> &Con { &self.map[id] }
}

impl<O> IndexMut<ConId> for Tree<O> {
    #[track_caller]
    fn index_mut(&mut self, id: ConId) -> &mut Con { &mut self.map[id] }
}

/// Receives notifications when containers enter or leave the arena.
pub trait Observer {
    fn added_to_forest(&mut self, map: &ConMap, id: ConId);
    fn removed_from_forest(&mut self, map: &ConMap, id: ConId);
}

impl Observer for () {
    fn added_to_forest(&mut self, _map: &ConMap, _id: ConId) {}

    fn removed_from_forest(&mut self, _map: &ConMap, _id: ConId) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertAt {
    Back,
    Front,
    Sibling(ConId, Position),
}

slotmap::new_key_type! {
    /// Generation-checked handle of a container.
    pub struct ConId;
}

/// All live containers, addressable in O(1).
pub struct ConMap {
    map: SlotMap<ConId, Node>,
}

struct Node {
    parent: Option<ConId>,
    nodes: Vec<ConId>,
    floating_nodes: Vec<ConId>,
    focus: Vec<ConId>,
    con: Con,
}

impl Node {
    fn new(con: Con) -> Self {
        Node {
            parent: None,
            nodes: Vec::new(),
            floating_nodes: Vec::new(),
            focus: Vec::new(),
            con,
        }
    }
}

impl ConMap {
    fn new() -> ConMap { ConMap { map: SlotMap::with_key() } }

    pub fn contains(&self, id: ConId) -> bool { self.map.contains_key(id) }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (ConId, &Con)> + '_ {
        self.map.iter().map(|(id, n)| (id, &n.con))
    }

    pub fn get(&self, id: ConId) -> Option<&Con> { self.map.get(id).map(|n| &n.con) }

    #[track_caller]
    fn node(&self, id: ConId) -> &Node {
        self.map.get(id).unwrap_or_else(|| panic!("stale container handle {id:?}"))
    }

    #[track_caller]
    fn node_mut(&mut self, id: ConId) -> &mut Node {
        self.map.get_mut(id).unwrap_or_else(|| panic!("stale container handle {id:?}"))
    }
}

impl Index<ConId> for ConMap {
    type Output = Con;

    #[track_caller]
    fn index(&self, id: ConId) -> &Con { &self.node(id).con }
}

impl IndexMut<ConId> for ConMap {
    #[track_caller]
    fn index_mut(&mut self, id: ConId) -> &mut Con { &mut self.node_mut(id).con }
}

impl ConId {
    #[track_caller]
    pub fn parent(self, map: &ConMap) -> Option<ConId> { map.node(self).parent }

    /// Tiling children in layout order.
    #[track_caller]
    pub fn nodes(self, map: &ConMap) -> &[ConId] { &map.node(self).nodes }

    #[track_caller]
    pub fn floating_nodes(self, map: &ConMap) -> &[ConId] { &map.node(self).floating_nodes }

    /// All direct children, most recently focused first.
    #[track_caller]
    pub fn focus_order(self, map: &ConMap) -> &[ConId] { &map.node(self).focus }

    /// Tiling children followed by floating children.
    pub fn children(self, map: &ConMap) -> impl Iterator<Item = ConId> + '_ {
        let node = map.node(self);
        node.nodes.iter().chain(node.floating_nodes.iter()).copied()
    }

    pub fn num_children(self, map: &ConMap) -> usize { map.node(self).nodes.len() }

    pub fn first_focused(self, map: &ConMap) -> Option<ConId> { map.node(self).focus.first().copied() }

    /// Returns an iterator over all ancestors of the current container, including itself.
    pub fn ancestors(self, map: &ConMap) -> impl Iterator<Item = ConId> + '_ {
        let mut next = Some(self);
        std::iter::from_fn(move || {
            let id = next;
            next = id.and_then(|n| map.map.get(n).and_then(|nd| nd.parent));
            id
        })
    }

    pub fn has_ancestor(self, ancestor: ConId, map: &ConMap) -> bool {
        self.ancestors(map).skip(1).any(|a| a == ancestor)
    }

    /// Index in whichever of the parent's structural lists holds this container.
    pub fn index_in_parent(self, map: &ConMap) -> Option<usize> {
        let parent = self.parent(map)?;
        let node = map.node(parent);
        node.nodes
            .iter()
            .position(|&c| c == self)
            .or_else(|| node.floating_nodes.iter().position(|&c| c == self))
    }

    fn siblings(self, map: &ConMap) -> &[ConId] {
        let Some(parent) = self.parent(map) else {
            return &[];
        };
        let node = map.node(parent);
        if node.nodes.contains(&self) { &node.nodes } else { &node.floating_nodes }
    }

    pub fn next_sibling(self, map: &ConMap) -> Option<ConId> {
        let siblings = self.siblings(map);
        let i = siblings.iter().position(|&c| c == self)?;
        siblings.get(i + 1).copied()
    }

    pub fn prev_sibling(self, map: &ConMap) -> Option<ConId> {
        let siblings = self.siblings(map);
        let i = siblings.iter().position(|&c| c == self)?;
        i.checked_sub(1).map(|j| siblings[j])
    }

    /// Parents before children, tiling before floating.
    pub fn traverse_preorder(self, map: &ConMap) -> impl Iterator<Item = ConId> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = map.node(id);
            stack.extend(node.floating_nodes.iter().rev());
            stack.extend(node.nodes.iter().rev());
            Some(id)
        })
    }

    /// Children before parents. The order is computed up front, so the tree
    /// may be mutated while consuming it.
    pub fn traverse_postorder(self, map: &ConMap) -> std::vec::IntoIter<ConId> {
        fn visit(id: ConId, map: &ConMap, out: &mut Vec<ConId>) {
            for child in id.children(map) {
                visit(child, map, out);
            }
            out.push(id);
        }
        let mut out = Vec::new();
        visit(self, map, &mut out);
        out.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// ```text
    ///            root
    ///          /   |   \
    ///        a     b    f (floating)
    ///              |
    ///              c
    /// ```
    struct TestTree {
        tree: Tree<Events>,
        root: ConId,
        a: ConId,
        b: ConId,
        c: ConId,
        f: ConId,
    }

    impl TestTree {
        fn new() -> Self {
            let mut tree = Tree::with_observer(Events(vec![]));
            let root = tree.mk_con(Con::named(ConType::Workspace, "root"));
            let a = tree.mk_con(Con::named(ConType::Con, "a"));
            let b = tree.mk_con(Con::named(ConType::Con, "b"));
            let c = tree.mk_con(Con::named(ConType::Con, "c"));
            let f = tree.mk_con(Con::named(ConType::FloatingCon, "f"));
            tree.link(a, root, InsertAt::Back);
            tree.link(b, root, InsertAt::Back);
            tree.link(c, b, InsertAt::Back);
            tree.link(f, root, InsertAt::Back);
            tree.data.0.clear();
            TestTree { tree, root, a, b, c, f }
        }

        fn map(&self) -> &ConMap { &self.tree.map }
    }

    #[derive(Clone, PartialEq, Debug)]
    enum TreeEvent {
        AddedToForest(ConId),
        RemovedFromForest(ConId),
    }
    use TreeEvent::*;

    struct Events(Vec<TreeEvent>);

    impl Observer for Events {
        fn added_to_forest(&mut self, _map: &ConMap, id: ConId) { self.0.push(AddedToForest(id)) }

        fn removed_from_forest(&mut self, _map: &ConMap, id: ConId) {
            self.0.push(RemovedFromForest(id))
        }
    }

    #[test]
    fn floating_wrappers_go_to_the_floating_list() {
        let t = TestTree::new();
        assert_eq!(t.root.nodes(t.map()), &[t.a, t.b]);
        assert_eq!(t.root.floating_nodes(t.map()), &[t.f]);
        assert_eq!(t.root.focus_order(t.map()), &[t.a, t.b, t.f]);
        assert_eq!(t.root.children(t.map()).collect::<Vec<_>>(), vec![t.a, t.b, t.f]);
    }

    #[test]
    fn link_relative_to_sibling() {
        let mut t = TestTree::new();
        let d = t.tree.mk_con(Con::new(ConType::Con));
        t.tree.link(d, t.root, InsertAt::Sibling(t.a, Position::After));
        assert_eq!(t.root.nodes(t.map()), &[t.a, d, t.b]);
        let e = t.tree.mk_con(Con::new(ConType::Con));
        t.tree.link(e, t.root, InsertAt::Sibling(t.a, Position::Before));
        assert_eq!(t.root.nodes(t.map()), &[e, t.a, d, t.b]);
        assert_eq!(t.root.focus_order(t.map()), &[t.a, t.b, t.f, d, e]);
    }

    #[test]
    fn link_then_unlink_restores_parent() {
        let mut t = TestTree::new();
        let nodes_before = t.root.nodes(t.map()).to_vec();
        let focus_before = t.root.focus_order(t.map()).to_vec();
        let d = t.tree.mk_con(Con::new(ConType::Con));
        t.tree.link(d, t.root, InsertAt::Front);
        t.tree.focus_front(d);
        t.tree.unlink(d);
        assert_eq!(t.root.nodes(t.map()), nodes_before.as_slice());
        assert_eq!(t.root.focus_order(t.map()), focus_before.as_slice());
        assert_eq!(d.parent(t.map()), None);
    }

    #[test]
    fn focus_front_reorders_only_focus() {
        let mut t = TestTree::new();
        t.tree.focus_front(t.b);
        assert_eq!(t.root.focus_order(t.map()), &[t.b, t.a, t.f]);
        assert_eq!(t.root.nodes(t.map()), &[t.a, t.b]);
    }

    #[test]
    fn replace_keeps_position_in_both_sequences() {
        let mut t = TestTree::new();
        t.tree.focus_front(t.b);
        let wrapper = t.tree.mk_con(Con::new(ConType::Con));
        t.tree.replace(t.b, wrapper);
        assert_eq!(t.root.nodes(t.map()), &[t.a, wrapper]);
        assert_eq!(t.root.focus_order(t.map()), &[wrapper, t.a, t.f]);
        assert_eq!(t.b.parent(t.map()), None);
        assert_eq!(wrapper.parent(t.map()), Some(t.root));
    }

    #[test]
    fn swap_across_parents() {
        let mut t = TestTree::new();
        t.tree.swap(t.a, t.c);
        assert_eq!(t.root.nodes(t.map()), &[t.c, t.b]);
        assert_eq!(t.b.nodes(t.map()), &[t.a]);
        assert_eq!(t.a.parent(t.map()), Some(t.b));
        assert_eq!(t.c.parent(t.map()), Some(t.root));
    }

    #[test]
    #[should_panic]
    fn swap_with_ancestor_panics() {
        let mut t = TestTree::new();
        t.tree.swap(t.b, t.c);
    }

    #[test]
    fn siblings() {
        let t = TestTree::new();
        assert_eq!(t.a.next_sibling(t.map()), Some(t.b));
        assert_eq!(t.b.prev_sibling(t.map()), Some(t.a));
        assert_eq!(t.b.next_sibling(t.map()), None);
        assert_eq!(t.f.next_sibling(t.map()), None);
        assert_eq!(t.f.prev_sibling(t.map()), None);
    }

    #[test]
    fn traversal_orders() {
        let t = TestTree::new();
        assert_eq!(
            t.root.traverse_preorder(t.map()).collect::<Vec<_>>(),
            vec![t.root, t.a, t.b, t.c, t.f]
        );
        assert_eq!(
            t.root.traverse_postorder(t.map()).collect::<Vec<_>>(),
            vec![t.a, t.c, t.b, t.f, t.root]
        );
        assert_eq!(t.c.ancestors(t.map()).collect::<Vec<_>>(), vec![t.c, t.b, t.root]);
        assert!(t.c.has_ancestor(t.root, t.map()));
        assert!(!t.c.has_ancestor(t.c, t.map()));
    }

    #[test]
    fn remove_reports_to_observer() {
        let mut t = TestTree::new();
        t.tree.unlink(t.c);
        let con = t.tree.remove(t.c);
        assert_eq!(con.name, "c");
        assert_eq!(t.tree.data.0, vec![RemovedFromForest(t.c)]);
        assert!(!t.map().contains(t.c));
        assert!(t.b.nodes(t.map()).is_empty());
    }

    #[test]
    #[should_panic]
    fn remove_attached_panics() {
        let mut t = TestTree::new();
        t.tree.remove(t.a);
    }

    #[test]
    #[should_panic]
    fn set_focus_order_rejects_foreign_children() {
        let mut t = TestTree::new();
        let (a, c, root) = (t.a, t.c, t.root);
        t.tree.set_focus_order(root, vec![a, c]);
    }

    #[test]
    fn mk_con_reports_to_observer() {
        let mut tree = Tree::with_observer(Events(vec![]));
        let id = tree.mk_con(Con::new(ConType::Con));
        assert_eq!(tree.data.0, vec![AddedToForest(id)]);
    }
}
