use crate::backend::{ComputeBackend, WorkMode};
use crate::core::ParamValue;
use crate::core::compile::{self, CompiledJob};
use crate::core::component::{Component, OutputRef};
use crate::core::error::PipelineError;
use crate::core::party::{PartyId, Role, RoleRegistry};
use crate::job::{JobHandle, JobSubmitter};
use std::collections::{BTreeMap, HashMap};

/// Which dependency category a wire belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    Data,
    Model,
}

/// A typed edge from a source component's output handle to a destination
/// component's named input slot.
#[derive(Debug, Clone)]
pub struct Wire {
    pub source: OutputRef,
    pub destination: String,
    pub slot: String,
    pub kind: WireKind,
}

/// The incoming wires of a component being registered, mirroring the
/// `data=`/`model=` keyword interface of the original build scripts.
///
/// ```
/// # use fedpipe::prelude::*;
/// # let registry = StageRegistry::builtin();
/// # let reader = Component::new("reader_0", registry.get("reader").unwrap());
/// let inputs = Inputs::new().data(reader.output("data").unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    wires: Vec<(WireKind, String, OutputRef)>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wires `source` into the plain `data` slot.
    pub fn data(self, source: OutputRef) -> Self {
        self.data_slot("data", source)
    }

    /// Wires `source` into the `train_data` slot.
    pub fn train_data(self, source: OutputRef) -> Self {
        self.data_slot("train_data", source)
    }

    /// Wires `source` into the `validate_data` slot.
    pub fn validate_data(self, source: OutputRef) -> Self {
        self.data_slot("validate_data", source)
    }

    /// Wires `source` into an arbitrary data slot of the destination kind.
    pub fn data_slot(mut self, slot: impl Into<String>, source: OutputRef) -> Self {
        self.wires.push((WireKind::Data, slot.into(), source));
        self
    }

    /// Wires `source` into the `model` slot.
    pub fn model(mut self, source: OutputRef) -> Self {
        self.wires.push((WireKind::Model, "model".to_string(), source));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }
}

/// The workflow graph: an ordered collection of components, the wires
/// between them, and the role registry, compiled into a submittable job
/// specification.
///
/// The pipeline exclusively owns its components and wires. Wires can only
/// reference already-registered components, so the registration order is a
/// valid topological order by construction and cycles are structurally
/// impossible.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    registry: RoleRegistry,
    components: Vec<Component>,
    index: HashMap<String, usize>,
    wires: Vec<Wire>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Designates the initiating party. May be called before `set_roles`.
    pub fn set_initiator(&mut self, role: Role, party_id: PartyId) -> Result<(), PipelineError> {
        self.registry.set_initiator(role, party_id)
    }

    /// Declares the participating parties per role.
    pub fn set_roles(&mut self, roles: BTreeMap<Role, Vec<PartyId>>) -> Result<(), PipelineError> {
        self.registry.set_roles(roles)
    }

    pub fn role_registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Registers `component` and, atomically, its incoming wires.
    ///
    /// Fail-fast: every wire is validated before anything is recorded, so a
    /// failed call leaves neither a half-registered node nor a dangling
    /// wire.
    pub fn add_component(
        &mut self,
        component: Component,
        inputs: Inputs,
    ) -> Result<(), PipelineError> {
        let name = component.name().to_string();
        if self.index.contains_key(&name) {
            return Err(PipelineError::DuplicateName(name));
        }

        let mut pending: Vec<Wire> = Vec::with_capacity(inputs.wires.len());
        for (kind, slot, source) in inputs.wires {
            let source_component = self.component(source.component()).ok_or_else(|| {
                PipelineError::UnknownSource {
                    component: name.clone(),
                    source_component: source.component().to_string(),
                }
            })?;
            if !source_component.stage().declares_output(source.handle()) {
                return Err(PipelineError::UnknownHandle {
                    component: source.component().to_string(),
                    handle: source.handle().to_string(),
                });
            }
            let Some(slot_spec) = component.stage().input_slot(&slot) else {
                return Err(PipelineError::GraphValidation(format!(
                    "stage kind '{}' of component '{name}' accepts no input slot '{slot}'",
                    component.stage().kind()
                )));
            };
            let occupied = pending.iter().filter(|w| w.slot == slot).count();
            if occupied >= slot_spec.max_wires {
                return Err(PipelineError::GraphValidation(format!(
                    "input slot '{slot}' of component '{name}' accepts at most {} wire(s)",
                    slot_spec.max_wires
                )));
            }
            pending.push(Wire {
                source,
                destination: name.clone(),
                slot,
                kind,
            });
        }

        log::debug!(
            "registered component '{name}' (kind '{}') with {} incoming wire(s)",
            component.stage().kind(),
            pending.len()
        );
        self.index.insert(name, self.components.len());
        self.components.push(component);
        self.wires.extend(pending);
        Ok(())
    }

    /// Merges `params` into the override set of `(role, party_id)` for the
    /// named component. The party must exist in the role registry.
    pub fn configure_for_party(
        &mut self,
        component: &str,
        role: Role,
        party_id: PartyId,
        params: BTreeMap<String, ParamValue>,
    ) -> Result<(), PipelineError> {
        if !self.registry.contains(role, party_id) {
            return Err(PipelineError::UnknownParty { role, party_id });
        }
        let idx = *self
            .index
            .get(component)
            .ok_or_else(|| PipelineError::NodeNotFound(component.to_string()))?;
        self.components[idx].merge_party_override(
            crate::core::party::Party::new(role, party_id),
            params,
        );
        Ok(())
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.index.get(name).map(|idx| &self.components[*idx])
    }

    /// Wiring reference to a registered component's output handle, for the
    /// common case where the component value was already moved into the
    /// graph.
    pub fn output(&self, component: &str, handle: &str) -> Result<OutputRef, PipelineError> {
        self.component(component)
            .ok_or_else(|| PipelineError::NodeNotFound(component.to_string()))?
            .output(handle)
    }

    /// Components in registration (topological) order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Validates the graph and derives the compiled job specification.
    ///
    /// Pure derivation of the current graph state; calling it again after
    /// further mutation recomputes the documents fresh.
    pub fn compile(&self) -> Result<CompiledJob, PipelineError> {
        compile::compile(self)
    }

    /// Compiles, submits, and waits for the job to reach a terminal state.
    pub async fn fit(
        &self,
        submitter: &JobSubmitter,
        backend: ComputeBackend,
        work_mode: WorkMode,
    ) -> Result<JobHandle, PipelineError> {
        let compiled = self.compile()?;
        let mut handle = submitter.submit(&compiled, backend, work_mode).await?;
        submitter
            .wait(&mut handle, JobSubmitter::DEFAULT_POLL_INTERVAL, None)
            .await?;
        Ok(handle)
    }
}
