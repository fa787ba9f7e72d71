//! Whole-tree plan validation.
//!
//! Everything that can be checked without touching the graph is checked
//! here, so a plan that fails validation creates nothing. Problems are
//! collected and reported together.

use super::{ChildRef, InstantiationPlan, PortRef, BOOTSTRAP_KEY, FACTORY_KEY};
use crate::engine::check_port_spec;
use crate::{Engine, EngineError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use weft_component::{Business, Direction};
use weft_controller::ControllerSpec;

/// A plan tree that passed validation.
pub(crate) struct Validated<'a> {
    /// First plan for each key in the tree.
    pub(crate) plans: HashMap<&'a str, &'a InstantiationPlan>,
    /// Payloads for planned keys, built ahead of creation.
    pub(crate) payloads: HashMap<&'a str, Arc<dyn Business>>,
}

impl Engine {
    pub(crate) fn validate_plan<'a>(
        &self,
        root: &'a InstantiationPlan,
    ) -> Result<Validated<'a>, EngineError> {
        let mut problems = Vec::new();
        let mut plans: HashMap<&str, &InstantiationPlan> = HashMap::new();

        for plan in root.plans() {
            let key = plan.key.as_str();
            if key.trim().is_empty() {
                problems.push("plan key must not be empty".to_string());
                continue;
            }
            if key == BOOTSTRAP_KEY || key == FACTORY_KEY {
                problems.push(format!("plan key '{key}' is reserved"));
                continue;
            }
            match plans.get(key) {
                Some(first) if *first != plan => {
                    problems.push(format!("key '{key}' is planned twice with different contents"));
                }
                Some(_) => {}
                None => {
                    plans.insert(key, plan);
                }
            }
        }

        self.check_controllers("membrane", &self.inner.config.membrane.controllers, &mut problems);

        let mut payloads = HashMap::new();
        for (key, plan) in &plans {
            if self.find_by_key(key).is_some() {
                continue;
            }
            self.check_declarations(plan, &mut problems);
            if let Some(payload) = &plan.payload {
                match self.inner.payload_catalog.read().build(payload) {
                    Ok(business) => {
                        payloads.insert(*key, business);
                    }
                    Err(e) => problems.push(format!("'{key}': {e}")),
                }
            }
        }

        for plan in plans.values() {
            for child in &plan.children {
                if let ChildRef::Key(child_key) = child {
                    if !plans.contains_key(child_key.as_str()) && self.find_by_key(child_key).is_none() {
                        problems.push(format!(
                            "'{}': child '{child_key}' is neither planned nor live",
                            plan.key
                        ));
                    }
                }
            }
            for binding in &plan.bindings {
                for (side, expected) in [
                    (&binding.required, Direction::Required),
                    (&binding.provided, Direction::Provided),
                ] {
                    if let Err(problem) = self.check_port_ref(&plans, &plan.key, side, expected) {
                        problems.push(problem);
                    }
                }
            }
        }

        if problems.is_empty() {
            Ok(Validated { plans, payloads })
        } else {
            problems.sort();
            Err(EngineError::InvalidPlan(problems.join("; ")))
        }
    }

    fn check_declarations(&self, plan: &InstantiationPlan, problems: &mut Vec<String>) {
        let key = &plan.key;
        let mut names = HashSet::new();
        for spec in &plan.ports {
            if let Err(e) = check_port_spec(spec) {
                problems.push(format!("'{key}': {e}"));
            }
            if !names.insert(spec.name.as_str()) {
                problems.push(format!("'{key}': duplicate port '{}'", spec.name));
            }
        }
        self.check_controllers(&format!("'{key}'"), &plan.controllers, problems);
    }

    fn check_controllers(&self, owner: &str, specs: &[ControllerSpec], problems: &mut Vec<String>) {
        let catalog = self.inner.controller_catalog.read();
        for spec in specs {
            if let Err(e) = spec.validate() {
                problems.push(format!("{owner}: {e}"));
            } else if !catalog.contains(&spec.kind) {
                problems.push(format!("{owner}: unknown controller kind '{}'", spec.kind));
            }
        }
    }

    fn check_port_ref(
        &self,
        plans: &HashMap<&str, &InstantiationPlan>,
        declaring: &str,
        side: &PortRef,
        expected: Direction,
    ) -> Result<(), String> {
        let owner = side.owner(declaring);
        let direction = if let Some(id) = self.find_by_key(owner) {
            self.port(id, &side.port)
                .and_then(|port| self.port_spec(port))
                .map(|spec| spec.direction)
                .map_err(|_| format!("'{declaring}': no port '{side}'"))?
        } else if let Some(plan) = plans.get(owner) {
            plan.ports
                .iter()
                .find(|p| p.name == side.port)
                .map(|p| p.direction)
                .ok_or_else(|| format!("'{declaring}': no port '{side}'"))?
        } else {
            return Err(format!("'{declaring}': unknown component '{owner}' in '{side}'"));
        };
        if direction == expected {
            Ok(())
        } else {
            Err(format!("'{declaring}': port '{side}' must be {expected}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{BindingSpec, PortRef};
    use serde_json::json;
    use crate::EngineConfig;
    use weft_component::{Cardinality, PortSpec};

    fn invalid(engine: &Engine, plan: &InstantiationPlan) -> String {
        match engine.validate_plan(plan) {
            Err(EngineError::InvalidPlan(msg)) => msg,
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("plan should be invalid"),
        }
    }

    #[test]
    fn accepts_well_formed_tree() {
        let engine = Engine::new();
        let plan = InstantiationPlan::new("app")
            .with_port(PortSpec::required("db", "Db"))
            .with_child(InstantiationPlan::new("db").with_port(PortSpec::provided("sql", "Db")))
            .with_binding(BindingSpec::new(PortRef::local("db"), PortRef::of("db", "sql")));
        let validated = engine.validate_plan(&plan).unwrap();
        assert_eq!(validated.plans.len(), 2);
    }

    #[test]
    fn rejects_reserved_and_empty_keys() {
        let engine = Engine::new();
        assert!(invalid(&engine, &InstantiationPlan::new("factory")).contains("reserved"));
        assert!(invalid(&engine, &InstantiationPlan::new(" ")).contains("empty"));
    }

    #[test]
    fn rejects_malformed_ports() {
        let engine = Engine::new();
        let plan = InstantiationPlan::new("svc")
            .with_port(PortSpec::provided("p", "X"))
            .with_port(PortSpec::provided("p", "X"))
            .with_port(PortSpec::required("q", ""))
            .with_port(PortSpec::required("r", "X").with_cardinality(Cardinality::new(3, 2)));
        let msg = invalid(&engine, &plan);
        assert!(msg.contains("duplicate port 'p'"));
        assert!(msg.contains("invalid port 'q'"));
        assert!(msg.contains("invalid port 'r'"));
    }

    #[test]
    fn rejects_unknown_controller_and_payload() {
        let engine = Engine::new();
        let plan = InstantiationPlan::new("svc")
            .with_controller(ControllerSpec::new("nope"))
            .with_payload("missing", json!(null));
        let msg = invalid(&engine, &plan);
        assert!(msg.contains("unknown controller kind 'nope'"));
        assert!(msg.contains("unknown payload 'missing'"));
    }

    #[test]
    fn rejects_unknown_uniform_controller() {
        let mut config = EngineConfig::default();
        config.membrane.controllers.push(ControllerSpec::new("trace"));
        config.membrane.controllers.push(ControllerSpec::new("nope"));
        let engine = Engine::with_config(config);

        let msg = invalid(&engine, &InstantiationPlan::new("svc"));
        assert_eq!(msg, "membrane: unknown controller kind 'nope'");
        assert!(matches!(
            engine.instantiate(&InstantiationPlan::new("svc")),
            Err(EngineError::InvalidPlan(_))
        ));
        assert!(engine.find_by_key("svc").is_none());
    }

    #[test]
    fn rejects_dangling_child_and_binding_refs() {
        let engine = Engine::new();
        let plan = InstantiationPlan::new("svc")
            .with_child_key("ghost")
            .with_port(PortSpec::provided("api", "X"))
            .with_binding(BindingSpec::new(PortRef::local("api"), PortRef::of("other", "p")));
        let msg = invalid(&engine, &plan);
        assert!(msg.contains("child 'ghost'"));
        assert!(msg.contains("'svc': port 'api' must be required"));
        assert!(msg.contains("unknown component 'other'"));
    }

    #[test]
    fn conflicting_duplicate_keys_rejected() {
        let engine = Engine::new();
        let same = InstantiationPlan::new("shared");
        let ok = InstantiationPlan::new("root")
            .with_child(InstantiationPlan::new("a").with_child(same.clone()))
            .with_child(InstantiationPlan::new("b").with_child(same));
        assert!(engine.validate_plan(&ok).is_ok());

        let clash = InstantiationPlan::new("root")
            .with_child(InstantiationPlan::new("x"))
            .with_child(InstantiationPlan::new("x").named("other"));
        assert!(invalid(&engine, &clash).contains("planned twice"));
    }

    #[test]
    fn live_components_satisfy_refs() {
        let engine = Engine::new();
        let plan = InstantiationPlan::new("client")
            .with_port(PortSpec::required("factory", "weft.factory"))
            .with_child_key("factory")
            .with_binding(BindingSpec::new(
                PortRef::local("factory"),
                PortRef::of("factory", "factory"),
            ));
        assert!(engine.validate_plan(&plan).is_ok());
    }
}
