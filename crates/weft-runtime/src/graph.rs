//! Graph & ownership manager.
//!
//! Components form a DAG of containment edges. A component may have
//! several parents (shared sub-component); edges are kept both ways in
//! the cells, never as owning pointers.
//!
//! Edge mutation serialises only the cycle check and the edge insert on
//! the engine's topology mutex. A component that loses its last parent
//! is queued as unreachable; [`Engine::collect_garbage`] destroys the
//! queue, or `gc.auto_collect` does so on every detach.

use crate::{ComponentView, Engine, EngineError};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use weft_types::ComponentId;

type Predicate = Box<dyn Fn(&ComponentView) -> bool + Send + Sync>;

/// Lazy depth-first walk from a root, yielding matching components.
///
/// Parents come before children, children in insertion order. A
/// component reachable along several paths is yielded once. Each step
/// reads the live graph, so edges added behind the cursor are not seen
/// until [`Traversal::restart`].
pub struct Traversal {
    engine: Engine,
    root: ComponentId,
    stack: Vec<ComponentId>,
    visited: HashSet<ComponentId>,
    predicate: Predicate,
}

impl Traversal {
    fn new(engine: Engine, root: ComponentId, predicate: Predicate) -> Self {
        Self {
            engine,
            root,
            stack: vec![root],
            visited: HashSet::new(),
            predicate,
        }
    }

    /// Rewinds to the root.
    pub fn restart(&mut self) {
        self.stack.clear();
        self.stack.push(self.root);
        self.visited.clear();
    }

    /// Root of the walk.
    #[must_use]
    pub fn root(&self) -> ComponentId {
        self.root
    }
}

impl Iterator for Traversal {
    type Item = ComponentView;

    fn next(&mut self) -> Option<ComponentView> {
        while let Some(id) = self.stack.pop() {
            if !self.visited.insert(id) {
                continue;
            }
            let Ok(view) = self.engine.view(id) else {
                continue;
            };
            for child in view.children.iter().rev() {
                if !self.visited.contains(child) {
                    self.stack.push(*child);
                }
            }
            if (self.predicate)(&view) {
                return Some(view);
            }
        }
        None
    }
}

impl std::fmt::Debug for Traversal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Traversal")
            .field("root", &self.root)
            .field("pending", &self.stack.len())
            .field("visited", &self.visited.len())
            .finish()
    }
}

impl Engine {
    /// Adds a containment edge.
    ///
    /// Attaching an existing edge is a no-op. Attaching removes the child
    /// from the unreachable queue.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if either component does not exist
    /// - [`EngineError::CycleDetected`] if `parent == child` or `parent`
    ///   is reachable from `child`
    pub fn attach(&self, parent: ComponentId, child: ComponentId) -> Result<(), EngineError> {
        let cycle = EngineError::CycleDetected { parent, child };
        if parent == child {
            return Err(cycle);
        }
        let parent_cell = self.cell(parent)?;
        self.cell(child)?;

        let _topology = self.inner.topology.lock();
        if parent_cell.node.read().children.contains(&child) {
            return Ok(());
        }
        if self.reaches(child, parent) {
            warn!(parent = %parent, child = %child, "attach rejected: cycle");
            return Err(cycle);
        }
        self.link_edge(parent, child);
        self.inner.unreachable.lock().retain(|c| *c != child);
        debug!(parent = %parent, child = %child, "attached");
        Ok(())
    }

    /// Removes a containment edge.
    ///
    /// A child left without parents is queued as unreachable, and
    /// destroyed right away when `gc.auto_collect` is set. Detaching a
    /// missing edge is a no-op.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if either component does not exist.
    pub fn detach(&self, parent: ComponentId, child: ComponentId) -> Result<(), EngineError> {
        let orphaned = {
            self.cell(parent)?;
            let child_cell = self.cell(child)?;
            let _topology = self.inner.topology.lock();
            if !self.unlink_edge(parent, child) {
                return Ok(());
            }
            child_cell.parents().is_empty()
        };
        debug!(parent = %parent, child = %child, orphaned, "detached");
        if orphaned {
            self.queue_unreachable(child);
            if self.inner.config.gc.auto_collect {
                self.collect_garbage();
            }
        }
        Ok(())
    }

    /// Walks the graph below `root`, yielding components matching
    /// `predicate`.
    pub fn find<P>(&self, root: ComponentId, predicate: P) -> Traversal
    where
        P: Fn(&ComponentView) -> bool + Send + Sync + 'static,
    {
        Traversal::new(self.clone(), root, Box::new(predicate))
    }

    /// Component built from the plan key `key`, if live.
    #[must_use]
    pub fn find_by_key(&self, key: &str) -> Option<ComponentId> {
        let id = ComponentId::keyed(key);
        self.contains(id).then_some(id)
    }

    /// Components named `name` below `root`, in traversal order.
    #[must_use]
    pub fn find_by_name(&self, root: ComponentId, name: &str) -> Vec<ComponentId> {
        let name = name.to_string();
        self.find(root, move |v| v.name == name)
            .map(|v| v.id)
            .collect()
    }

    /// Children in insertion order.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the component does not exist.
    pub fn children(&self, component: ComponentId) -> Result<Vec<ComponentId>, EngineError> {
        Ok(self.cell(component)?.children())
    }

    /// Parents in insertion order.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the component does not exist.
    pub fn parents(&self, component: ComponentId) -> Result<Vec<ComponentId>, EngineError> {
        Ok(self.cell(component)?.parents())
    }

    /// Returns `true` if `to` can be reached from `from` along child
    /// edges. A component reaches itself.
    #[must_use]
    pub fn is_reachable(&self, from: ComponentId, to: ComponentId) -> bool {
        self.reaches(from, to)
    }

    /// Components queued for destruction, oldest first.
    #[must_use]
    pub fn unreachable(&self) -> Vec<ComponentId> {
        self.inner.unreachable.lock().clone()
    }

    /// Destroys every unreachable component, cascading to children that
    /// become unreachable in turn. Returns the destroyed ids.
    ///
    /// A component whose destruction is vetoed stays queued.
    pub fn collect_garbage(&self) -> Vec<ComponentId> {
        let mut destroyed = Vec::new();
        let mut retained = Vec::new();
        loop {
            let batch = std::mem::take(&mut *self.inner.unreachable.lock());
            if batch.is_empty() {
                break;
            }
            for id in batch {
                let Ok(cell) = self.cell(id) else {
                    continue;
                };
                if !cell.parents().is_empty() {
                    continue;
                }
                match self.destroy_one(id) {
                    Ok(()) => destroyed.push(id),
                    Err(e) => {
                        warn!(component = %id, error = %e, "unreachable component kept");
                        retained.push(id);
                    }
                }
            }
        }
        if !retained.is_empty() {
            let mut queue = self.inner.unreachable.lock();
            for id in retained {
                if !queue.contains(&id) {
                    queue.push(id);
                }
            }
        }
        if !destroyed.is_empty() {
            info!(count = destroyed.len(), "collected unreachable components");
        }
        destroyed
    }

    pub(crate) fn queue_unreachable(&self, id: ComponentId) {
        if id == self.bootstrap_id() {
            return;
        }
        let mut queue = self.inner.unreachable.lock();
        if !queue.contains(&id) {
            debug!(component = %id, "component unreachable");
            queue.push(id);
        }
    }

    /// Inserts an edge without checks.
    pub(crate) fn link_edge(&self, parent: ComponentId, child: ComponentId) {
        if let Ok(cell) = self.cell(parent) {
            cell.node.write().children.push(child);
        }
        if let Ok(cell) = self.cell(child) {
            cell.node.write().parents.push(parent);
        }
    }

    /// Removes an edge without queueing. Returns `false` if it was absent.
    pub(crate) fn unlink_edge(&self, parent: ComponentId, child: ComponentId) -> bool {
        let mut removed = false;
        if let Ok(cell) = self.cell(parent) {
            let mut node = cell.node.write();
            let before = node.children.len();
            node.children.retain(|c| *c != child);
            removed = node.children.len() != before;
        }
        if let Ok(cell) = self.cell(child) {
            cell.node.write().parents.retain(|p| *p != parent);
        }
        removed
    }

    fn reaches(&self, from: ComponentId, to: ComponentId) -> bool {
        let mut stack = vec![from];
        let mut visited = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            if let Ok(cell) = self.cell(id) {
                stack.extend(cell.children());
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineConfig;
    use weft_component::LifecycleState;

    fn names(engine: &Engine, ids: &[ComponentId]) -> Vec<String> {
        ids.iter()
            .map(|id| engine.view(*id).unwrap().name)
            .collect()
    }

    #[test]
    fn attach_both_ways_and_idempotent() {
        let engine = Engine::new();
        let p = engine.create_component("p");
        let c = engine.create_component("c");
        engine.attach(p, c).unwrap();
        engine.attach(p, c).unwrap();
        assert_eq!(engine.children(p).unwrap(), vec![c]);
        assert_eq!(engine.parents(c).unwrap(), vec![p]);
    }

    #[test]
    fn self_and_descendant_cycles_rejected() {
        let engine = Engine::new();
        let a = engine.create_component("a");
        let b = engine.create_component("b");
        let c = engine.create_component("c");
        engine.attach(a, b).unwrap();
        engine.attach(b, c).unwrap();

        assert!(matches!(engine.attach(a, a), Err(EngineError::CycleDetected { .. })));
        assert!(matches!(engine.attach(c, a), Err(EngineError::CycleDetected { .. })));
        assert!(engine.children(c).unwrap().is_empty());
        assert!(engine.is_reachable(a, c));
        assert!(!engine.is_reachable(c, a));
    }

    #[test]
    fn shared_child_has_two_parents() {
        let engine = Engine::new();
        let p1 = engine.create_component("p1");
        let p2 = engine.create_component("p2");
        let s = engine.create_component("shared");
        engine.attach(p1, s).unwrap();
        engine.attach(p2, s).unwrap();
        assert_eq!(engine.parents(s).unwrap(), vec![p1, p2]);

        engine.detach(p1, s).unwrap();
        assert!(engine.unreachable().is_empty());
        engine.detach(p2, s).unwrap();
        assert_eq!(engine.unreachable(), vec![s]);
        assert!(engine.contains(s));

        engine.attach(p1, s).unwrap();
        assert!(engine.unreachable().is_empty());
    }

    #[test]
    fn find_is_preorder_insertion_ordered_and_visits_once() {
        let engine = Engine::new();
        let root = engine.create_component("root");
        let a = engine.create_component("a");
        let b = engine.create_component("b");
        let shared = engine.create_component("shared");
        let leaf = engine.create_component("leaf");
        engine.attach(root, a).unwrap();
        engine.attach(root, b).unwrap();
        engine.attach(a, shared).unwrap();
        engine.attach(b, shared).unwrap();
        engine.attach(shared, leaf).unwrap();

        let all: Vec<ComponentId> = engine.find(root, |_| true).map(|v| v.id).collect();
        assert_eq!(
            names(&engine, &all),
            vec!["root", "a", "shared", "leaf", "b"]
        );
    }

    #[test]
    fn find_filters_lazily_and_restarts() {
        let engine = Engine::new();
        let root = engine.create_component("root");
        for name in ["x1", "y", "x2"] {
            let c = engine.create_component(name);
            engine.attach(root, c).unwrap();
        }
        let mut walk = engine.find(root, |v| v.name.starts_with('x'));
        assert_eq!(walk.next().map(|v| v.name), Some("x1".to_string()));
        assert_eq!(walk.next().map(|v| v.name), Some("x2".to_string()));
        assert!(walk.next().is_none());

        walk.restart();
        assert_eq!(walk.count(), 2);
    }

    #[test]
    fn find_by_name_and_key() {
        let engine = Engine::new();
        let root = engine.bootstrap_id();
        let names_found = engine.find_by_name(root, "factory");
        assert_eq!(names_found, vec![engine.factory_id()]);
        assert_eq!(engine.find_by_key("factory"), Some(engine.factory_id()));
        assert_eq!(engine.find_by_key("absent"), None);
    }

    #[test]
    fn collect_destroys_orphans_and_cascades() {
        let engine = Engine::new();
        let root = engine.create_component("root");
        let mid = engine.create_component("mid");
        let leaf = engine.create_component("leaf");
        let kept = engine.create_component("kept");
        engine.attach(root, mid).unwrap();
        engine.attach(mid, leaf).unwrap();
        engine.attach(kept, leaf).unwrap();

        engine.detach(root, mid).unwrap();
        let destroyed = engine.collect_garbage();
        assert_eq!(destroyed, vec![mid]);
        assert!(!engine.contains(mid));
        assert!(engine.contains(leaf));
        assert_eq!(engine.parents(leaf).unwrap(), vec![kept]);
        assert!(engine.unreachable().is_empty());
    }

    #[test]
    fn auto_collect_on_detach() {
        let mut config = EngineConfig::default();
        config.gc.auto_collect = true;
        let engine = Engine::with_config(config);
        let root = engine.create_component("root");
        let child = engine.create_component("child");
        let grandchild = engine.create_component("grandchild");
        engine.attach(root, child).unwrap();
        engine.attach(child, grandchild).unwrap();
        engine.start(root).unwrap();

        engine.detach(root, child).unwrap();
        assert!(!engine.contains(child));
        assert!(!engine.contains(grandchild));
        assert_eq!(engine.state(root).unwrap(), LifecycleState::Started);
    }

    #[test]
    fn bootstrap_never_queued() {
        let engine = Engine::new();
        engine.queue_unreachable(engine.bootstrap_id());
        assert!(engine.unreachable().is_empty());
    }
}
