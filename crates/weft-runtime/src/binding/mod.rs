//! Port & binding resolver.
//!
//! A [`Binding`] is an immutable record held by its required port. Every
//! mutation takes the links lock of each port involved, in [`PortId`]
//! order, and swaps records in place:
//!
//! ```text
//! bind     required.outgoing += link      provided.incoming += id
//! rebind   required.outgoing[i] = link'   old.incoming -= id, new.incoming += id
//! unbind   required.outgoing -= link      provided.incoming -= id
//! ```
//!
//! [`Engine::resolve`] only takes the required port's read lock, so it
//! observes either the record before a rebind or the one after.

mod policy;

pub use policy::{SelectionPolicy, POLICY_ATTRIBUTE};

use crate::engine::{Link, PortCell, PortLinks};
use crate::{Engine, EngineError};
use parking_lot::RwLockWriteGuard;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};
use weft_component::{BindOptions, Binding, BindingKind, Direction, Reflective, Resolution};
use weft_types::{BindingId, ComponentId, PortId};

/// One resolved provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Binding that led here.
    pub binding: BindingId,
    /// Provided port.
    pub port: PortId,
    /// Owner of the provided port.
    pub component: ComponentId,
    /// Binding kind.
    pub kind: BindingKind,
}

/// Result of [`Engine::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Optional port with no bindings.
    None,
    /// Single-valued port.
    Single(Target),
    /// Multi-valued port, in policy order.
    Many(Vec<Target>),
}

impl Resolved {
    /// The first target, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Target> {
        match self {
            Self::None => None,
            Self::Single(t) => Some(t),
            Self::Many(ts) => ts.first(),
        }
    }

    /// All targets, in order.
    #[must_use]
    pub fn into_targets(self) -> Vec<Target> {
        match self {
            Self::None => Vec::new(),
            Self::Single(t) => vec![t],
            Self::Many(ts) => ts,
        }
    }

    /// Provided ports of all targets, in order.
    #[must_use]
    pub fn ports(&self) -> Vec<PortId> {
        self.clone().into_targets().iter().map(|t| t.port).collect()
    }

    /// Number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Single(_) => 1,
            Self::Many(ts) => ts.len(),
        }
    }

    /// Returns `true` if nothing was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type LinkGuards<'a> = BTreeMap<PortId, RwLockWriteGuard<'a, PortLinks>>;

/// Write-locks the links of every cell in [`PortId`] order.
fn lock_links(cells: &[Arc<PortCell>]) -> LinkGuards<'_> {
    let mut ordered: Vec<&Arc<PortCell>> = cells.iter().collect();
    ordered.sort_by_key(|c| c.id);
    ordered.dedup_by_key(|c| c.id);
    ordered
        .into_iter()
        .map(|c| (c.id, c.links.write()))
        .collect()
}

fn links_mut<'m, 'a>(
    guards: &'m mut LinkGuards<'a>,
    port: PortId,
) -> Result<&'m mut PortLinks, EngineError> {
    guards
        .get_mut(&port)
        .map(|g| &mut **g)
        .ok_or_else(|| EngineError::not_found(port))
}

fn expect_direction(cell: &PortCell, expected: Direction) -> Result<(), EngineError> {
    if cell.direction() == expected {
        Ok(())
    } else {
        Err(EngineError::DirectionMismatch {
            port: cell.name().to_string(),
            expected,
        })
    }
}

impl Engine {
    /// Binds with default priority.
    ///
    /// # Errors
    ///
    /// See [`Engine::bind_with`].
    pub fn bind(
        &self,
        required: PortId,
        provided: PortId,
        kind: BindingKind,
        resolution: Resolution,
    ) -> Result<BindingId, EngineError> {
        self.bind_with(required, provided, BindOptions::new(kind, resolution))
    }

    /// Creates a binding from `required` to `provided`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if either port does not exist
    /// - [`EngineError::DirectionMismatch`] unless the pair is required → provided
    /// - [`EngineError::ContractMismatch`] if the contracts are incompatible
    /// - [`EngineError::CardinalityExceeded`] if either port is full
    pub fn bind_with(
        &self,
        required: PortId,
        provided: PortId,
        options: BindOptions,
    ) -> Result<BindingId, EngineError> {
        let req = self.port_cell(required)?;
        let prov = self.port_cell(provided)?;
        expect_direction(&req, Direction::Required)?;
        expect_direction(&prov, Direction::Provided)?;
        self.check_contract(&req, &prov)?;

        let cells = [Arc::clone(&req), Arc::clone(&prov)];
        let id = {
            let mut guards = lock_links(&cells);

            let req_count = links_mut(&mut guards, required)?.outgoing.len();
            if req.cardinality().is_full(req_count) {
                return Err(EngineError::CardinalityExceeded {
                    port: req.name().to_string(),
                    max: req.cardinality().max,
                });
            }
            let prov_links = links_mut(&mut guards, provided)?;
            if prov.cardinality().is_full(prov_links.incoming.len()) {
                return Err(EngineError::CardinalityExceeded {
                    port: prov.name().to_string(),
                    max: prov.cardinality().max,
                });
            }

            let binding = Binding::new(required, provided, options, self.next_seq());
            let id = binding.id();
            prov_links.incoming.push((id, required));

            let req_links = links_mut(&mut guards, required)?;
            req_links.outgoing.push(Link {
                binding,
                provider: prov.owner,
            });
            req_links.refresh_cache(req.cardinality());

            self.inner.bindings.write().insert(id, required);
            id
        };

        debug!(
            binding = %id,
            required = %required,
            provided = %provided,
            "bound ports"
        );
        self.refresh_degradation(&req);
        Ok(id)
    }

    /// Resolves the providers behind a required port.
    ///
    /// A single eager binding on a single-valued port answers from its
    /// cached target. Otherwise the live bindings are ordered by the
    /// port's selection policy.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the port does not exist
    /// - [`EngineError::DirectionMismatch`] if the port is provided
    /// - [`EngineError::Unbound`] if nothing is bound and `min >= 1`
    pub fn resolve(&self, required: PortId) -> Result<Resolved, EngineError> {
        let cell = self.port_cell(required)?;
        expect_direction(&cell, Direction::Required)?;
        let policy = self.policy_for(&cell);

        let targets: Vec<Target> = {
            let links = cell.links.read();
            if let Some(target) = &links.cached {
                return Ok(Resolved::Single(target.clone()));
            }
            let mut ordered: Vec<&Link> = links.outgoing.iter().collect();
            policy.sort(&mut ordered, |l| &l.binding);
            if policy == SelectionPolicy::RoundRobin && !ordered.is_empty() {
                let turn = cell.cursor.fetch_add(1, Ordering::Relaxed) % ordered.len();
                ordered.rotate_left(turn);
            }
            ordered.iter().map(|l| l.target()).collect()
        };

        if targets.is_empty() {
            return if cell.cardinality().min >= 1 {
                Err(EngineError::Unbound {
                    port: cell.name().to_string(),
                })
            } else {
                Ok(Resolved::None)
            };
        }

        if cell.cardinality().is_multiple() {
            Ok(Resolved::Many(targets))
        } else {
            Ok(targets
                .into_iter()
                .next()
                .map_or(Resolved::None, Resolved::Single))
        }
    }

    /// Retargets the port's highest-priority binding to `new_provided`.
    ///
    /// The binding keeps its id, kind and priority. The swap happens
    /// under the required port's write lock.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if either port does not exist
    /// - [`EngineError::DirectionMismatch`] on wrong port directions
    /// - [`EngineError::ContractMismatch`] if the new provider is incompatible
    /// - [`EngineError::CardinalityExceeded`] if the new provider is full
    /// - [`EngineError::Unbound`] if the port has no binding to retarget
    pub fn rebind(&self, required: PortId, new_provided: PortId) -> Result<BindingId, EngineError> {
        let req = self.port_cell(required)?;
        let next = self.port_cell(new_provided)?;
        expect_direction(&req, Direction::Required)?;
        expect_direction(&next, Direction::Provided)?;
        self.check_contract(&req, &next)?;

        loop {
            let (binding, old) = {
                let links = req.links.read();
                let mut ordered: Vec<&Link> = links.outgoing.iter().collect();
                SelectionPolicy::Priority.sort(&mut ordered, |l| &l.binding);
                match ordered.first() {
                    Some(l) => (l.binding.id(), l.binding.provided()),
                    None => {
                        return Err(EngineError::Unbound {
                            port: req.name().to_string(),
                        })
                    }
                }
            };
            if old == new_provided {
                return Ok(binding);
            }

            let mut cells = vec![Arc::clone(&req), Arc::clone(&next)];
            if let Ok(old_cell) = self.port_cell(old) {
                cells.push(old_cell);
            }
            let mut guards = lock_links(&cells);

            let req_links = links_mut(&mut guards, required)?;
            let Some(pos) = req_links.position(binding) else {
                continue;
            };
            if req_links.outgoing[pos].binding.provided() != old {
                continue;
            }

            let next_links = links_mut(&mut guards, new_provided)?;
            if next.cardinality().is_full(next_links.incoming.len()) {
                return Err(EngineError::CardinalityExceeded {
                    port: next.name().to_string(),
                    max: next.cardinality().max,
                });
            }
            next_links.incoming.push((binding, required));

            if let Some(old_links) = guards.get_mut(&old) {
                old_links.incoming.retain(|(b, _)| *b != binding);
            }

            let req_links = links_mut(&mut guards, required)?;
            let link = &mut req_links.outgoing[pos];
            link.binding = link.binding.retarget(new_provided);
            link.provider = next.owner;
            req_links.refresh_cache(req.cardinality());

            info!(
                binding = %binding,
                required = %required,
                from = %old,
                to = %new_provided,
                "rebound port"
            );
            return Ok(binding);
        }
    }

    /// Destroys a binding.
    ///
    /// If the required port drops below its minimum while its owner is
    /// STARTED, the owner is flagged degraded. It is never stopped.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the binding does not exist.
    pub fn unbind(&self, binding: BindingId) -> Result<(), EngineError> {
        let required = self.required_port_of(binding)?;
        let req = self.port_cell(required)?;
        self.remove_link(&req, binding)?;
        debug!(binding = %binding, required = %required, "unbound");
        self.refresh_degradation(&req);
        Ok(())
    }

    /// Bindings touching a port: outgoing for a required port, incoming
    /// for a provided one.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the port does not exist.
    pub fn bindings_of(&self, port: PortId) -> Result<Vec<Binding>, EngineError> {
        let cell = self.port_cell(port)?;
        match cell.direction() {
            Direction::Required => Ok(cell
                .links
                .read()
                .outgoing
                .iter()
                .map(|l| l.binding.clone())
                .collect()),
            Direction::Provided => {
                let incoming = cell.links.read().incoming.clone();
                Ok(incoming
                    .into_iter()
                    .filter_map(|(id, _)| self.binding(id).ok())
                    .collect())
            }
        }
    }

    /// Looks up a binding record.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the binding does not exist.
    pub fn binding(&self, id: BindingId) -> Result<Binding, EngineError> {
        let required = self.required_port_of(id)?;
        let cell = self.port_cell(required)?;
        let links = cell.links.read();
        links
            .position(id)
            .map(|pos| links.outgoing[pos].binding.clone())
            .ok_or_else(|| EngineError::not_found(id))
    }

    /// Runs `f` on a binding record under its port's write lock.
    pub(crate) fn with_binding_mut<R>(
        &self,
        id: BindingId,
        f: impl FnOnce(&mut Binding) -> R,
    ) -> Result<R, EngineError> {
        let required = self.required_port_of(id)?;
        let cell = self.port_cell(required)?;
        let mut links = cell.links.write();
        let pos = links.position(id).ok_or_else(|| EngineError::not_found(id))?;
        Ok(f(&mut links.outgoing[pos].binding))
    }

    fn required_port_of(&self, binding: BindingId) -> Result<PortId, EngineError> {
        self.inner
            .bindings
            .read()
            .get(&binding)
            .copied()
            .ok_or_else(|| EngineError::not_found(binding))
    }

    fn check_contract(&self, req: &PortCell, prov: &PortCell) -> Result<(), EngineError> {
        let contracts = self.inner.contracts.read();
        if contracts.is_compatible(&prov.spec.contract, &req.spec.contract) {
            Ok(())
        } else {
            Err(EngineError::ContractMismatch {
                required: req.spec.contract.clone(),
                provided: prov.spec.contract.clone(),
            })
        }
    }

    fn policy_for(&self, cell: &PortCell) -> SelectionPolicy {
        let fallback = self.inner.config.resolution.policy;
        let port = cell.port.read();
        match port.get(POLICY_ATTRIBUTE).ok().and_then(Value::as_str) {
            Some(name) => name.parse::<SelectionPolicy>().unwrap_or_else(|e| {
                warn!(port = %cell.id, error = %e, "ignoring port policy attribute");
                fallback
            }),
            None => fallback,
        }
    }

    /// Removes one outgoing link of `req` and its incoming mirror.
    pub(crate) fn remove_link(
        &self,
        req: &Arc<PortCell>,
        binding: BindingId,
    ) -> Result<(), EngineError> {
        loop {
            let provided = {
                let links = req.links.read();
                let pos = links
                    .position(binding)
                    .ok_or_else(|| EngineError::not_found(binding))?;
                links.outgoing[pos].binding.provided()
            };

            let mut cells = vec![Arc::clone(req)];
            if let Ok(prov) = self.port_cell(provided) {
                cells.push(prov);
            }
            let mut guards = lock_links(&cells);

            let req_links = links_mut(&mut guards, req.id)?;
            let pos = req_links
                .position(binding)
                .ok_or_else(|| EngineError::not_found(binding))?;
            if req_links.outgoing[pos].binding.provided() != provided {
                continue;
            }
            req_links.outgoing.remove(pos);
            req_links.refresh_cache(req.cardinality());

            if let Some(prov_links) = guards.get_mut(&provided) {
                prov_links.incoming.retain(|(b, _)| *b != binding);
            }
            self.inner.bindings.write().remove(&binding);
            return Ok(());
        }
    }

    /// Re-evaluates the degraded flag of a required port's owner.
    pub(crate) fn refresh_degradation(&self, port: &PortCell) {
        if port.direction() != Direction::Required {
            return;
        }
        let under = port.cardinality().is_under(port.count());
        let Ok(owner) = self.cell(port.owner) else {
            return;
        };
        let mut node = owner.node.write();
        if node.track_degraded(port.id, under) {
            if under {
                warn!(component = %owner.id, port = %port.name(), "component degraded");
            } else {
                info!(component = %owner.id, port = %port.name(), "component recovered");
            }
        }
    }
}
