use crate::core::ParamValue;
use crate::core::component::DatasetRef;
use crate::core::error::PipelineError;
use crate::core::party::{Party, PartyId, Role};
use crate::core::pipeline::Pipeline;
use serde::Serialize;
use std::collections::BTreeMap;

/// Effective parameters of one component, per role and party id.
pub type ComponentConf = BTreeMap<Role, BTreeMap<PartyId, BTreeMap<String, ParamValue>>>;

/// The static configuration document: initiator, role map, and the
/// per-party effective parameters of every component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobConf {
    pub initiator: Party,
    pub roles: BTreeMap<Role, Vec<PartyId>>,
    pub components: BTreeMap<String, ComponentConf>,
}

/// One task of the execution DAG document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSpec {
    pub name: String,
    pub kind: String,
    pub depends_on: Vec<String>,
}

/// The execution DAG document: tasks in deterministic topological order
/// (registration order, which is ancestor-before-descendant by
/// construction).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDsl {
    pub tasks: Vec<TaskSpec>,
}

/// The two-document artifact submitted to the execution backend. Derived
/// deterministically from the graph state at compile time; never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledJob {
    pub conf: JobConf,
    pub dsl: JobDsl,
}

impl CompiledJob {
    pub fn conf_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(&self.conf)?)
    }

    pub fn dsl_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(&self.dsl)?)
    }

    /// Names of all compiled components, in task order.
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.dsl.tasks.iter().map(|task| task.name.as_str())
    }
}

/// Validates `pipeline` and derives its compiled job specification.
pub(crate) fn compile(pipeline: &Pipeline) -> Result<CompiledJob, PipelineError> {
    let registry = pipeline.role_registry();
    registry
        .validate()
        .map_err(|e| PipelineError::GraphValidation(e.to_string()))?;

    // Overrides must reference registered parties even when the role map was
    // replaced after the component was configured.
    for component in pipeline.components() {
        for party in component.override_parties() {
            if !registry.contains(party.role, party.party_id) {
                return Err(PipelineError::GraphValidation(format!(
                    "component '{}' has overrides for unregistered party {party}",
                    component.name()
                )));
            }
        }
    }

    // Wires are validated when added; re-check slot arity so a compiled job
    // can never carry an over-subscribed slot.
    for component in pipeline.components() {
        let mut per_slot: BTreeMap<&str, usize> = BTreeMap::new();
        for wire in pipeline.wires().iter().filter(|w| w.destination == component.name()) {
            *per_slot.entry(wire.slot.as_str()).or_default() += 1;
        }
        for (slot, count) in per_slot {
            let max = component
                .stage()
                .input_slot(slot)
                .map(|s| s.max_wires)
                .unwrap_or(0);
            if count > max {
                return Err(PipelineError::GraphValidation(format!(
                    "input slot '{slot}' of component '{}' holds {count} wire(s), allows {max}",
                    component.name()
                )));
            }
        }
    }

    let mut components = BTreeMap::new();
    for component in pipeline.components() {
        let mut conf: ComponentConf = BTreeMap::new();
        for party in registry.parties() {
            let effective = component.effective_parameters(party);
            if component.stage().kind() == "reader" {
                check_table_shape(component.name(), party, &effective)?;
            }
            conf.entry(party.role)
                .or_default()
                .insert(party.party_id, effective);
        }
        components.insert(component.name().to_string(), conf);
    }

    let tasks = pipeline
        .components()
        .iter()
        .map(|component| {
            let mut depends_on: Vec<String> = Vec::new();
            for wire in pipeline.wires() {
                if wire.destination == component.name()
                    && !depends_on.iter().any(|d| d == wire.source.component())
                {
                    depends_on.push(wire.source.component().to_string());
                }
            }
            TaskSpec {
                name: component.name().to_string(),
                kind: component.stage().kind().to_string(),
                depends_on,
            }
        })
        .collect();

    let compiled = CompiledJob {
        conf: JobConf {
            // validate() above guarantees the initiator is present.
            initiator: registry.initiator().expect("validated registry"),
            roles: registry.roles().clone(),
            components,
        },
        dsl: JobDsl { tasks },
    };
    log::debug!(
        "compiled job specification with {} task(s)",
        compiled.dsl.tasks.len()
    );
    Ok(compiled)
}

/// Shape-only check of the `{name, namespace}` dataset reference a reader
/// carries for a party. Existence is the catalog's concern, not ours.
fn check_table_shape(
    component: &str,
    party: Party,
    params: &BTreeMap<String, ParamValue>,
) -> Result<(), PipelineError> {
    let Some(value) = params.get("table") else {
        return Ok(());
    };
    let table: DatasetRef = serde_json::from_value(value.clone()).map_err(|_| {
        PipelineError::GraphValidation(format!(
            "reader '{component}': 'table' for {party} must be a {{name, namespace}} object"
        ))
    })?;
    if !table.is_well_formed() {
        return Err(PipelineError::GraphValidation(format!(
            "reader '{component}': 'table' for {party} has an empty name or namespace"
        )));
    }
    Ok(())
}
