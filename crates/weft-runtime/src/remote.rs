//! Remote adapters as stub components.

use crate::engine::check_port_spec;
use crate::{Engine, EngineError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use weft_component::{Business, Cardinality, PortSpec, RemoteAdapter, RemoteBusiness};
use weft_types::PortId;

/// Name of the provided port on a remote stub.
pub const REMOTE_PORT: &str = "remote";

impl Engine {
    /// Wraps `adapter` in a STARTED stub component under `bootstrap`.
    ///
    /// The stub exposes one provided port, [`REMOTE_PORT`], carrying
    /// `contract`. Bind to it with `BindingKind::Remote`. The stub carries
    /// the configured membrane controllers.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidPort`] for a blank contract
    /// - [`EngineError::Controller`] if a configured membrane controller
    ///   cannot be built; nothing is created
    /// - [`EngineError::TransitionRejected`] if a controller vetoes the start
    pub fn register_remote(
        &self,
        name: &str,
        contract: &str,
        adapter: Arc<dyn RemoteAdapter>,
    ) -> Result<PortId, EngineError> {
        let spec = PortSpec::provided(REMOTE_PORT, contract).with_cardinality(Cardinality::any());
        check_port_spec(&spec)?;

        let payload: Arc<dyn Business> = Arc::new(RemoteBusiness::new(adapter));
        let cell = self.insert_component(name, None, Some(payload), BTreeMap::new());
        let stub = cell.id;
        let assembled = self.add_port(stub, spec).and_then(|port| {
            self.attach_uniform(stub, &[])?;
            self.attach(self.bootstrap_id(), stub)?;
            Ok(port)
        });
        let port = match assembled {
            Ok(port) => port,
            Err(e) => {
                self.dismantle(&cell, false);
                return Err(e);
            }
        };
        if let Err(e) = self.start(stub) {
            if let Err(destroy_err) = self.destroy(stub) {
                warn!(component = %stub, error = %destroy_err, "remote stub not destroyed");
            }
            return Err(e);
        }
        info!(component = %stub, name, contract, "remote registered");
        Ok(port)
    }
}
