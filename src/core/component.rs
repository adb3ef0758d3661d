use crate::core::ParamValue;
use crate::core::error::PipelineError;
use crate::core::party::Party;
use crate::core::stage::StageSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A reference to a `{name, namespace}` dataset in the external catalog.
///
/// The catalog itself is outside this crate; only the shape is checked
/// (both fields present and non-empty) when the compiler sees it in a
/// reader's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRef {
    pub name: String,
    pub namespace: String,
}

impl DatasetRef {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        !self.name.is_empty() && !self.namespace.is_empty()
    }
}

/// An opaque reference to one output handle of a registered component,
/// used to wire downstream inputs without knowing concrete values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRef {
    component: String,
    handle: String,
}

impl OutputRef {
    pub(crate) fn new(component: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            handle: handle.into(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }
}

/// A named, typed processing stage of the workflow graph.
///
/// A component carries a default parameter set plus per-party overrides,
/// letting heterogeneous parties (a label-holding guest vs. label-blind
/// hosts) run the same logical stage with different behavior. Effective
/// parameters for a party are the defaults with that party's override keys
/// applied on top.
#[derive(Debug, Clone)]
pub struct Component {
    name: String,
    stage: Arc<StageSpec>,
    defaults: BTreeMap<String, ParamValue>,
    overrides: BTreeMap<Party, BTreeMap<String, ParamValue>>,
}

impl Component {
    pub fn new(name: impl Into<String>, stage: Arc<StageSpec>) -> Self {
        Self {
            name: name.into(),
            stage,
            defaults: BTreeMap::new(),
            overrides: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> &Arc<StageSpec> {
        &self.stage
    }

    /// Chainable default-parameter setter for build scripts.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    /// Merges `params` into the default set, last writer wins per key.
    pub fn set_default_parameters(&mut self, params: BTreeMap<String, ParamValue>) {
        for (key, value) in params {
            if self.defaults.insert(key.clone(), value).is_some() {
                log::debug!("component '{}': default parameter '{key}' overwritten", self.name);
            }
        }
    }

    /// Returns a wiring reference to one of this component's output handles.
    pub fn output(&self, handle: &str) -> Result<OutputRef, PipelineError> {
        if !self.stage.declares_output(handle) {
            return Err(PipelineError::UnknownHandle {
                component: self.name.clone(),
                handle: handle.to_string(),
            });
        }
        Ok(OutputRef::new(&self.name, handle))
    }

    /// Merges `params` into the override set of `party`. The party's
    /// membership in the role registry is checked by the enclosing pipeline
    /// before this is called.
    pub(crate) fn merge_party_override(
        &mut self,
        party: Party,
        params: BTreeMap<String, ParamValue>,
    ) {
        let slot = self.overrides.entry(party).or_default();
        for (key, value) in params {
            if slot.insert(key.clone(), value).is_some() {
                log::debug!(
                    "component '{}': override '{key}' for {party} overwritten",
                    self.name
                );
            }
        }
    }

    pub fn defaults(&self) -> &BTreeMap<String, ParamValue> {
        &self.defaults
    }

    pub(crate) fn override_parties(&self) -> impl Iterator<Item = Party> + '_ {
        self.overrides.keys().copied()
    }

    /// Defaults with `party`'s overrides applied key by key; parties with no
    /// override get the defaults verbatim.
    pub fn effective_parameters(&self, party: Party) -> BTreeMap<String, ParamValue> {
        let mut merged = self.defaults.clone();
        if let Some(overrides) = self.overrides.get(&party) {
            for (key, value) in overrides {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::party::Role;
    use crate::core::stage::StageRegistry;
    use serde_json::json;

    fn trainer() -> Component {
        let stage = StageRegistry::builtin().get("hetero_lr").unwrap();
        Component::new("hetero_lr_0", stage)
            .with_param("penalty", "L2")
            .with_param("max_iter", 10)
    }

    #[test]
    fn overrides_merge_onto_defaults() {
        let mut component = trainer();
        let guest = Party::new(Role::Guest, 9999);
        component.merge_party_override(
            guest,
            BTreeMap::from([("max_iter".to_string(), json!(30))]),
        );

        let effective = component.effective_parameters(guest);
        assert_eq!(effective["penalty"], json!("L2"));
        assert_eq!(effective["max_iter"], json!(30));

        // A party without overrides sees the defaults verbatim.
        let host = Party::new(Role::Host, 10000);
        assert_eq!(component.effective_parameters(host)["max_iter"], json!(10));
    }

    #[test]
    fn repeated_override_is_last_writer_wins() {
        let mut component = trainer();
        let guest = Party::new(Role::Guest, 9999);
        component.merge_party_override(
            guest,
            BTreeMap::from([("optimizer".to_string(), json!("sgd"))]),
        );
        component.merge_party_override(
            guest,
            BTreeMap::from([("optimizer".to_string(), json!("adam"))]),
        );
        assert_eq!(component.effective_parameters(guest)["optimizer"], json!("adam"));
        // Untouched keys survive the second merge.
        assert_eq!(component.effective_parameters(guest)["penalty"], json!("L2"));
    }

    #[test]
    fn undeclared_output_handle_is_rejected() {
        let component = trainer();
        assert!(component.output("model").is_ok());
        let err = component.output("gradients").unwrap_err();
        assert!(matches!(err, PipelineError::UnknownHandle { .. }));
    }

    #[test]
    fn dataset_ref_shape() {
        assert!(DatasetRef::new("breast_hetero_guest", "experiment").is_well_formed());
        assert!(!DatasetRef::new("", "experiment").is_well_formed());
    }
}
