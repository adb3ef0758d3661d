use crate::core::error::PipelineError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One named input slot of a stage kind and how many wires it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: String,
    pub max_wires: usize,
}

/// The capability table of one stage kind: which input slots it accepts
/// (split into data inputs and model inputs) and which output handles it
/// exposes.
///
/// Stage capabilities are configuration data, not compiler logic; new kinds
/// are added through [`StageRegistry::register`] without touching the
/// pipeline or the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    kind: String,
    data_inputs: Vec<SlotSpec>,
    model_inputs: Vec<SlotSpec>,
    outputs: Vec<String>,
}

impl StageSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data_inputs: Vec::new(),
            model_inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn data_slot(mut self, name: impl Into<String>, max_wires: usize) -> Self {
        self.data_inputs.push(SlotSpec {
            name: name.into(),
            max_wires,
        });
        self
    }

    pub fn model_slot(mut self, name: impl Into<String>, max_wires: usize) -> Self {
        self.model_inputs.push(SlotSpec {
            name: name.into(),
            max_wires,
        });
        self
    }

    pub fn output(mut self, handle: impl Into<String>) -> Self {
        self.outputs.push(handle.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn declares_output(&self, handle: &str) -> bool {
        self.outputs.iter().any(|h| h == handle)
    }

    /// Looks up an input slot across both the data and model categories.
    pub fn input_slot(&self, name: &str) -> Option<&SlotSpec> {
        self.data_inputs
            .iter()
            .chain(self.model_inputs.iter())
            .find(|slot| slot.name == name)
    }
}

/// Registry of stage kinds available to a pipeline.
#[derive(Debug, Clone)]
pub struct StageRegistry {
    stages: BTreeMap<String, Arc<StageSpec>>,
}

impl StageRegistry {
    pub fn empty() -> Self {
        Self {
            stages: BTreeMap::new(),
        }
    }

    /// The stage kinds the stock federated workflow ships with.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(StageSpec::new("reader").output("data"));
        registry.register(
            StageSpec::new("data_io")
                .data_slot("data", 1)
                .model_slot("model", 1)
                .output("data")
                .output("model"),
        );
        registry.register(
            StageSpec::new("intersection")
                .data_slot("data", 1)
                .output("data"),
        );
        registry.register(
            StageSpec::new("hetero_lr")
                .data_slot("train_data", 1)
                .data_slot("validate_data", 1)
                .model_slot("model", 1)
                .output("data")
                .output("model"),
        );
        registry.register(
            StageSpec::new("evaluation")
                .data_slot("data", 2)
                .output("data"),
        );
        registry
    }

    pub fn register(&mut self, spec: StageSpec) {
        self.stages.insert(spec.kind.clone(), Arc::new(spec));
    }

    pub fn get(&self, kind: &str) -> Result<Arc<StageSpec>, PipelineError> {
        self.stages
            .get(kind)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownStageKind(kind.to_string()))
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
