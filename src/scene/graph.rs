use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Weak;

use slotmap::SlotMap;
use tracing::{debug, error, trace};

use crate::config::KernelConfig;
use crate::error::{BrushworkError, Result, SceneError};
use crate::math::Aabb;
use crate::selection::{ComponentMode, SelectionPool, SelectionTest};

use super::entity_node::EntityNode;
use super::node::SceneNode;
use super::{LayerId, NodeId, ObserverId, SignalHandlerId};

/// Receives structural changes of a [`SceneGraph`].
///
/// Callbacks fire after the graph is structurally consistent again.
pub trait GraphObserver {
    fn on_node_insert(&mut self, node: NodeId);

    fn on_node_erase(&mut self, node: NodeId);

    /// Something about the scene changed as a whole.
    fn on_scene_changed(&mut self) {}
}

/// Pre-order visitor for [`SceneGraph::traverse`].
pub trait NodeVisitor {
    /// Returns `false` to skip the node's children.
    fn pre(&mut self, id: NodeId, node: &dyn SceneNode) -> bool;

    fn post(&mut self, _id: NodeId, _node: &dyn SceneNode) {}
}

#[derive(Debug)]
struct NodeEntry {
    node: Box<dyn SceneNode>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    layers: BTreeSet<LayerId>,
}

/// The editable world: a tree of nodes under one root.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Observers are
/// held weakly; bounds-changed handlers are owned and removed by id.
pub struct SceneGraph {
    config: KernelConfig,
    nodes: SlotMap<NodeId, NodeEntry>,
    root: Option<NodeId>,
    observers: SlotMap<ObserverId, Weak<RefCell<dyn GraphObserver>>>,
    bounds_handlers: SlotMap<SignalHandlerId, Box<dyn FnMut()>>,
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .field("observers", &self.observers.len())
            .field("bounds_handlers", &self.bounds_handlers.len())
            .finish()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl SceneGraph {
    /// Creates a graph with no root.
    #[must_use]
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            nodes: SlotMap::with_key(),
            root: None,
            observers: SlotMap::with_key(),
            bounds_handlers: SlotMap::with_key(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    // --- Root ---

    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Replaces the root, releasing the previous tree.
    ///
    /// Released nodes get `on_remove_from_scene`; observers are told once
    /// through `on_scene_changed` rather than per node.
    pub fn set_root(&mut self, node: Box<dyn SceneNode>) -> NodeId {
        self.drop_tree();
        let id = self.nodes.insert(NodeEntry {
            node,
            parent: None,
            children: Vec::new(),
            layers: BTreeSet::new(),
        });
        self.root = Some(id);
        if let Some(entry) = self.nodes.get_mut(id) {
            entry.node.on_insert_into_scene();
        }
        debug!(?id, "set scene root");
        self.scene_changed();
        id
    }

    /// Releases the whole tree, leaving the graph without a root.
    pub fn release_root(&mut self) {
        if self.root.is_none() {
            return;
        }
        self.drop_tree();
        debug!("released scene root");
        self.scene_changed();
    }

    // --- Structure ---

    /// Inserts `node` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not in the graph.
    pub fn insert(&mut self, parent: NodeId, node: Box<dyn SceneNode>) -> Result<NodeId> {
        let layers = self.entry(parent)?.layers.clone();
        let id = self.nodes.insert(NodeEntry {
            node,
            parent: Some(parent),
            children: Vec::new(),
            layers,
        });
        if let Some(entry) = self.nodes.get_mut(parent) {
            entry.children.push(id);
        }
        if let Some(entry) = self.nodes.get_mut(id) {
            entry.node.on_insert_into_scene();
            debug!(?id, ?parent, name = entry.node.name(), "insert node");
        }
        self.notify(|o| o.on_node_insert(id));
        Ok(id)
    }

    /// Removes `id` and its subtree.
    ///
    /// Every removed node gets `on_remove_from_scene` and one
    /// `on_node_erase` notification, children before parents.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not in the graph or is the root.
    pub fn erase(&mut self, id: NodeId) -> Result<()> {
        if self.root == Some(id) {
            return Err(SceneError::RootErase.into());
        }
        let parent = self.entry(id)?.parent;
        if let Some(entry) = parent.and_then(|p| self.nodes.get_mut(p)) {
            entry.children.retain(|&child| child != id);
        }
        let removed = self.detach_subtree(id);
        debug!(?id, removed = removed.len(), "erase node");
        for erased in removed {
            self.notify(|o| o.on_node_erase(erased));
        }
        Ok(())
    }

    /// Moves `id` under `new_parent`, keeping its subtree.
    ///
    /// Observers see an erase followed by an insert of `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if either node is missing, `id` is the root, or
    /// `new_parent` lies inside the subtree of `id`.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> Result<()> {
        if self.root == Some(id) {
            return Err(SceneError::RootErase.into());
        }
        self.entry(new_parent)?;
        let old_parent = self.entry(id)?.parent;
        if self.subtree(id).contains(&new_parent) {
            return Err(SceneError::CyclicParent.into());
        }
        if let Some(entry) = old_parent.and_then(|p| self.nodes.get_mut(p)) {
            entry.children.retain(|&child| child != id);
        }
        if let Some(entry) = self.nodes.get_mut(new_parent) {
            entry.children.push(id);
        }
        if let Some(entry) = self.nodes.get_mut(id) {
            entry.parent = Some(new_parent);
        }
        trace!(?id, ?new_parent, "reparent node");
        self.notify(|o| o.on_node_erase(id));
        self.notify(|o| o.on_node_insert(id));
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not in the graph.
    pub fn node(&self, id: NodeId) -> Result<&dyn SceneNode> {
        Ok(self.entry(id)?.node.as_ref())
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not in the graph.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut dyn SceneNode> {
        Ok(self.entry_mut(id)?.node.as_mut())
    }

    /// Downcasts a node to its concrete type.
    #[must_use]
    pub fn node_as<T: SceneNode + 'static>(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id)?.node.as_any().downcast_ref()
    }

    pub fn node_as_mut<T: SceneNode + 'static>(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(id)?.node.as_any_mut().downcast_mut()
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id) {
            Some(entry) => &entry.children,
            None => &[],
        }
    }

    // --- Traversal ---

    /// Visits the whole tree in pre-order.
    pub fn traverse(&self, visitor: &mut dyn NodeVisitor) {
        if let Some(root) = self.root {
            self.traverse_from(root, visitor);
        }
    }

    /// Visits the subtree under `id` in pre-order.
    pub fn traverse_from(&self, id: NodeId, visitor: &mut dyn NodeVisitor) {
        let Some(entry) = self.nodes.get(id) else {
            return;
        };
        if visitor.pre(id, entry.node.as_ref()) {
            for &child in &entry.children {
                self.traverse_from(child, visitor);
            }
        }
        visitor.post(id, entry.node.as_ref());
    }

    /// Calls `f` for every node in pre-order.
    pub fn for_each_node(&self, mut f: impl FnMut(NodeId, &dyn SceneNode)) {
        struct Walker<F>(F);
        impl<F: FnMut(NodeId, &dyn SceneNode)> NodeVisitor for Walker<F> {
            fn pre(&mut self, id: NodeId, node: &dyn SceneNode) -> bool {
                (self.0)(id, node);
                true
            }
        }
        self.traverse(&mut Walker(&mut f));
    }

    /// Ids of `id` and all its descendants, in pre-order.
    #[must_use]
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(entry) = self.nodes.get(next) else {
                continue;
            };
            out.push(next);
            stack.extend(entry.children.iter().rev());
        }
        out
    }

    // --- Observation ---

    pub fn add_scene_observer(&mut self, observer: Weak<RefCell<dyn GraphObserver>>) -> ObserverId {
        self.observers.insert(observer)
    }

    /// Unregisters an observer. Unknown ids are ignored.
    pub fn remove_scene_observer(&mut self, id: ObserverId) {
        self.observers.remove(id);
    }

    /// Tells every observer the scene changed as a whole.
    pub fn scene_changed(&mut self) {
        self.notify(|o| o.on_scene_changed());
    }

    /// Registers a handler called on every [`SceneGraph::bounds_changed`].
    pub fn add_bounds_changed_callback(&mut self, handler: impl FnMut() + 'static) -> SignalHandlerId {
        self.bounds_handlers.insert(Box::new(handler))
    }

    /// Unregisters a handler. Unknown or already removed ids are ignored.
    pub fn remove_bounds_changed_callback(&mut self, id: SignalHandlerId) {
        self.bounds_handlers.remove(id);
    }

    /// Signals that aggregate bounds must be re-queried.
    ///
    /// Not emitted by mutations; callers emit it once after a batch of edits.
    pub fn bounds_changed(&mut self) {
        trace!(handlers = self.bounds_handlers.len(), "bounds changed");
        for handler in self.bounds_handlers.values_mut() {
            handler();
        }
    }

    // --- Bounds ---

    /// Union of the local bounds of `id` and its descendants.
    #[must_use]
    pub fn subtree_aabb(&self, id: NodeId) -> Aabb {
        self.subtree(id)
            .into_iter()
            .filter_map(|n| self.nodes.get(n))
            .fold(Aabb::empty(), |acc, entry| acc.union(&entry.node.local_aabb()))
    }

    /// Bounds of the whole scene.
    #[must_use]
    pub fn world_aabb(&self) -> Aabb {
        self.root.map_or_else(Aabb::empty, |root| self.subtree_aabb(root))
    }

    // --- Layers ---

    /// # Errors
    ///
    /// Returns an error if `id` is not in the graph.
    pub fn layers(&self, id: NodeId) -> Result<&BTreeSet<LayerId>> {
        Ok(&self.entry(id)?.layers)
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not in the graph.
    pub fn add_to_layer(&mut self, id: NodeId, layer: LayerId) -> Result<()> {
        self.entry_mut(id)?.layers.insert(layer);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not in the graph.
    pub fn remove_from_layer(&mut self, id: NodeId, layer: LayerId) -> Result<()> {
        self.entry_mut(id)?.layers.remove(&layer);
        Ok(())
    }

    /// Replaces the layers of `id` and every descendant with `layers`.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not in the graph.
    pub fn assign_subtree_to_layers(&mut self, id: NodeId, layers: &BTreeSet<LayerId>) -> Result<()> {
        self.entry(id)?;
        for node in self.subtree(id) {
            if let Some(entry) = self.nodes.get_mut(node) {
                entry.layers.clone_from(layers);
            }
        }
        Ok(())
    }

    /// Nodes tagged with `layer`, in pre-order.
    #[must_use]
    pub fn nodes_in_layer(&self, layer: LayerId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.for_each_node(|id, _| {
            if self.nodes.get(id).is_some_and(|e| e.layers.contains(&layer)) {
                out.push(id);
            }
        });
        out
    }

    // --- Selection ---

    /// # Errors
    ///
    /// Returns an error if `id` is missing or not selectable.
    pub fn set_selected(&mut self, id: NodeId, selected: bool) -> Result<()> {
        self.node_mut(id)?
            .as_selectable_mut()
            .ok_or(SceneError::MissingCapability("selectable"))?
            .set_selected(selected);
        Ok(())
    }

    #[must_use]
    pub fn is_selected(&self, id: NodeId) -> bool {
        self.nodes
            .get(id)
            .and_then(|e| e.node.as_selectable())
            .is_some_and(|s| s.is_selected())
    }

    /// Selected nodes in pre-order.
    #[must_use]
    pub fn selected_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.for_each_node(|id, node| {
            if node.as_selectable().is_some_and(|s| s.is_selected()) {
                out.push(id);
            }
        });
        out
    }

    /// Selects or deselects every selectable node.
    pub fn set_selected_all(&mut self, selected: bool) {
        for entry in self.nodes.values_mut() {
            if let Some(selectable) = entry.node.as_selectable_mut() {
                selectable.set_selected(selected);
            }
        }
    }

    /// Object-level hits of every testable node, reported in pre-order.
    #[must_use]
    pub fn test_select(&self, test: &SelectionTest) -> SelectionPool {
        let mut pool = SelectionPool::new();
        self.for_each_node(|id, node| {
            if let Some(testable) = node.as_selection_testable() {
                testable.test_select(id, &mut pool, test);
            }
        });
        pool
    }

    /// Component hits of the selected objects.
    #[must_use]
    pub fn test_select_components(&self, test: &SelectionTest, mode: ComponentMode) -> SelectionPool {
        let mut pool = SelectionPool::new();
        self.for_each_node(|id, node| {
            let selected = node.as_selectable().is_some_and(|s| s.is_selected());
            if let (true, Some(editable)) = (selected, node.as_component_editable()) {
                editable.test_select_components(id, &mut pool, test, mode);
            }
        });
        pool
    }

    /// # Errors
    ///
    /// Returns an error if `id` is missing, has no components, or `index`
    /// is out of range.
    pub fn select_component(
        &mut self,
        id: NodeId,
        mode: ComponentMode,
        index: usize,
        selected: bool,
    ) -> Result<()> {
        self.node_mut(id)?
            .as_component_editable_mut()
            .ok_or(SceneError::MissingCapability("component editable"))?
            .select_component(mode, index, selected)
    }

    /// Selects or deselects every component of `mode` in the graph.
    pub fn set_selected_components(&mut self, selected: bool, mode: ComponentMode) {
        for entry in self.nodes.values_mut() {
            if let Some(editable) = entry.node.as_component_editable_mut() {
                editable.set_selected_components(selected, mode);
            }
        }
    }

    /// Union of every node's selected-component bounds.
    #[must_use]
    pub fn selected_components_bounds(&self) -> Aabb {
        self.nodes
            .values()
            .filter_map(|e| e.node.as_component_editable())
            .fold(Aabb::empty(), |acc, e| acc.union(&e.selected_components_bounds()))
    }

    /// Creates an entity under the root and moves the selected primitives
    /// into it.
    ///
    /// The entity takes the layers of the first selected primitive and passes
    /// them to its new children. Afterwards only the entity is selected.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph has no root.
    pub fn create_entity_from_selection(&mut self, classname: &str) -> Result<NodeId> {
        let root = self.root.ok_or(SceneError::NoRoot)?;
        let primitives: Vec<NodeId> = self
            .selected_nodes()
            .into_iter()
            .filter(|&id| self.nodes.get(id).is_some_and(|e| e.node.as_component_editable().is_some()))
            .collect();

        let layers = match primitives.first() {
            Some(&first) => self.layers(first)?.clone(),
            None => self.layers(root)?.clone(),
        };
        let entity = self.insert(root, Box::new(EntityNode::new(classname)))?;
        for &primitive in &primitives {
            self.reparent(primitive, entity)?;
        }
        self.assign_subtree_to_layers(entity, &layers)?;

        self.set_selected_all(false);
        self.set_selected(entity, true)?;
        debug!(?entity, classname, primitives = primitives.len(), "created entity from selection");
        Ok(entity)
    }

    // --- Consistency ---

    /// Checks parent/child links and every node's derived state.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvariantViolation`] describing the first
    /// inconsistency found.
    pub fn debug_verify(&self) -> Result<()> {
        let violation = |msg: String| -> BrushworkError { SceneError::InvariantViolation(msg).into() };
        if let Some(root) = self.root {
            if self.entry(root)?.parent.is_some() {
                return Err(violation("root has a parent".into()));
            }
            let reachable = self.subtree(root).len();
            if reachable != self.nodes.len() {
                return Err(violation(format!(
                    "{reachable} nodes reachable from root, {} stored",
                    self.nodes.len()
                )));
            }
        } else if !self.nodes.is_empty() {
            return Err(violation("nodes stored without a root".into()));
        }
        for (id, entry) in &self.nodes {
            for &child in &entry.children {
                if self.parent(child) != Some(id) {
                    return Err(violation(format!("{child:?} does not point back to {id:?}")));
                }
            }
            entry.node.debug_verify()?;
        }
        Ok(())
    }

    // --- Internal ---

    fn entry(&self, id: NodeId) -> Result<&NodeEntry> {
        self.nodes.get(id).ok_or_else(|| SceneError::NodeNotFound.into())
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut NodeEntry> {
        self.nodes.get_mut(id).ok_or_else(|| SceneError::NodeNotFound.into())
    }

    /// Removes the subtree under `id` from the arena, children first.
    fn detach_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        let mut order = self.subtree(id);
        order.reverse();
        for &node in &order {
            if let Some(mut entry) = self.nodes.remove(node) {
                entry.node.on_remove_from_scene();
            }
        }
        order
    }

    fn drop_tree(&mut self) {
        if let Some(root) = self.root.take() {
            self.detach_subtree(root);
        }
    }

    fn notify(&mut self, f: impl Fn(&mut dyn GraphObserver)) {
        self.observers.retain(|_, observer| observer.strong_count() > 0);
        for observer in self.observers.values() {
            let Some(observer) = observer.upgrade() else {
                continue;
            };
            let borrowed = observer.try_borrow_mut();
            match borrowed {
                Ok(mut observer) => f(&mut *observer),
                Err(_) => error!("scene observer is already borrowed, notification dropped"),
            }
        }
    }
}

impl Drop for SceneGraph {
    fn drop(&mut self) {
        self.drop_tree();
    }
}
