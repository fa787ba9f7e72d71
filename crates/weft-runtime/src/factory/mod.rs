//! Factory & instantiation.
//!
//! [`Engine::instantiate`] turns an [`InstantiationPlan`] into components
//! in three phases:
//!
//! ```text
//! validate   whole tree, nothing created          ─► InvalidPlan
//! create     depth-first: ports, controllers,
//!            children (attached under parent)
//! bind       every planned binding, in plan order
//! ```
//!
//! A failure in `create` or `bind` rolls back everything recorded in the
//! journal, so the graph is left as it was, and the original error is
//! returned.
//!
//! Keys are identities: a key that is live in the graph, or was already
//! created earlier in the same tree, is reused rather than duplicated.

mod payload;
mod plan;
mod service;
mod validate;

pub use payload::PayloadCatalog;
pub use plan::{BindingSpec, ChildRef, InstantiationPlan, PayloadRef, PortRef};
pub(crate) use service::FactoryService;
pub use service::INSTANTIATE_OPERATION;

use crate::{Engine, EngineError};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use validate::Validated;
use weft_types::{BindingId, ComponentId};

/// Key of the root component.
pub const BOOTSTRAP_KEY: &str = "bootstrap";
/// Key of the factory component.
pub const FACTORY_KEY: &str = "factory";
/// Name of the factory's provided port.
pub const FACTORY_PORT: &str = "factory";
/// Contract of the factory's provided port.
pub const FACTORY_CONTRACT: &str = "weft.factory";

#[derive(Default)]
struct Journal {
    components: Vec<ComponentId>,
    edges: Vec<(ComponentId, ComponentId)>,
    adopted: Vec<ComponentId>,
    bindings: Vec<BindingId>,
}

struct Build<'a> {
    validated: Validated<'a>,
    ids: HashMap<String, ComponentId>,
    reused: HashSet<String>,
    in_progress: HashSet<String>,
    journal: Journal,
}

impl Engine {
    /// Instantiates a plan tree and returns the root component.
    ///
    /// The root is left unattached and every new component NEW; attach
    /// and start it as needed.
    ///
    /// Instantiations are serialized, so concurrent calls planning the
    /// same key create it once and the rest reuse it.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidPlan`] if validation fails; nothing is created
    /// - [`EngineError::CycleDetected`] if key references loop
    /// - binding errors such as [`EngineError::ContractMismatch`]; the
    ///   graph is rolled back
    pub fn instantiate(&self, plan: &InstantiationPlan) -> Result<ComponentId, EngineError> {
        let _serial = self.inner.instantiation.lock();
        let validated = self.validate_plan(plan)?;
        let mut build = Build {
            validated,
            ids: HashMap::new(),
            reused: HashSet::new(),
            in_progress: HashSet::new(),
            journal: Journal::default(),
        };

        let result = self
            .create_planned(plan, &mut build)
            .and_then(|root| self.bind_planned(plan, &mut build).map(|()| root));

        match result {
            Ok(root) => {
                info!(
                    key = %plan.key,
                    root = %root,
                    created = build.journal.components.len(),
                    bindings = build.journal.bindings.len(),
                    "plan instantiated"
                );
                Ok(root)
            }
            Err(e) => {
                warn!(key = %plan.key, error = %e, "instantiation failed, rolling back");
                self.roll_back(build.journal);
                Err(e)
            }
        }
    }

    fn create_planned(
        &self,
        plan: &InstantiationPlan,
        build: &mut Build<'_>,
    ) -> Result<ComponentId, EngineError> {
        let key = plan.key.as_str();
        if let Some(id) = build.ids.get(key) {
            return Ok(*id);
        }
        if let Some(id) = self.find_by_key(key) {
            debug!(key, component = %id, "reusing live component");
            build.ids.insert(key.to_string(), id);
            build.reused.insert(key.to_string());
            return Ok(id);
        }
        build.in_progress.insert(key.to_string());

        let payload = build.validated.payloads.get(key).cloned();
        let cell = self.insert_component(
            plan.display_name(),
            Some(key),
            payload,
            plan.attributes.clone(),
        );
        let id = cell.id;
        build.journal.components.push(id);

        for spec in &plan.ports {
            self.add_port(id, spec.clone())?;
        }

        self.attach_uniform(id, &plan.controllers)?;
        for spec in &plan.controllers {
            self.attach_controller_spec(id, spec)?;
        }

        for child in &plan.children {
            let child_key = child.key();
            if build.in_progress.contains(child_key) {
                return Err(EngineError::CycleDetected {
                    parent: id,
                    child: ComponentId::keyed(child_key),
                });
            }
            let child_id = match child {
                ChildRef::Plan(nested) => self.create_planned(nested, build)?,
                ChildRef::Key(k) => match build.validated.plans.get(k.as_str()).copied() {
                    Some(planned) => self.create_planned(planned, build)?,
                    None => self
                        .find_by_key(k)
                        .ok_or_else(|| EngineError::not_found(format!("component '{k}'")))?,
                },
            };
            let was_unreachable = self.unreachable().contains(&child_id);
            self.attach(id, child_id)?;
            build.journal.edges.push((id, child_id));
            if was_unreachable {
                build.journal.adopted.push(child_id);
            }
        }

        build.in_progress.remove(key);
        build.ids.insert(key.to_string(), id);
        debug!(key, component = %id, "component created from plan");
        Ok(id)
    }

    fn bind_planned(&self, root: &InstantiationPlan, build: &mut Build<'_>) -> Result<(), EngineError> {
        let mut seen = HashSet::new();
        for plan in root.plans() {
            if !seen.insert(plan.key.as_str()) || build.reused.contains(&plan.key) {
                continue;
            }
            for spec in &plan.bindings {
                let required = self.planned_port(&build.ids, &plan.key, &spec.required)?;
                let provided = self.planned_port(&build.ids, &plan.key, &spec.provided)?;
                let binding = self.bind_with(required, provided, spec.options())?;
                build.journal.bindings.push(binding);
            }
        }
        Ok(())
    }

    fn planned_port(
        &self,
        ids: &HashMap<String, ComponentId>,
        declaring: &str,
        side: &PortRef,
    ) -> Result<weft_types::PortId, EngineError> {
        let owner = side.owner(declaring);
        let component = ids
            .get(owner)
            .copied()
            .or_else(|| self.find_by_key(owner))
            .ok_or_else(|| EngineError::not_found(format!("component '{owner}'")))?;
        self.port(component, &side.port)
    }

    fn roll_back(&self, journal: Journal) {
        for binding in journal.bindings.iter().rev() {
            let _ = self.unbind(*binding);
        }
        {
            let _topology = self.inner.topology.lock();
            for (parent, child) in journal.edges.iter().rev() {
                self.unlink_edge(*parent, *child);
            }
        }
        for component in journal.components.iter().rev() {
            if let Ok(cell) = self.cell(*component) {
                self.dismantle(&cell, false);
            }
        }
        for adopted in journal.adopted {
            self.queue_unreachable(adopted);
        }
        debug!("rollback complete");
    }
}
