//! A complete example: a multi-host hetero logistic-regression workflow.
//!
//! This example demonstrates:
//! - Declaring the participating parties from a runtime configuration
//! - Configuring one logical stage differently per party
//! - Wiring components into a pipeline graph
//! - Compiling the graph into the two submittable documents
//! - Submitting against the in-memory standalone backend and reading the
//!   per-component summaries

use fedpipe::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

fn table(name: &str) -> BTreeMap<String, ParamValue> {
    BTreeMap::from([(
        "table".to_string(),
        serde_json::to_value(DatasetRef::new(name, "experiment")).unwrap(),
    )])
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), PipelineError> {
    // Normally loaded from a config file by the caller; only the shape is
    // the library's concern.
    let conf: RuntimeConf = serde_json::from_value(json!({
        "parties": {
            "guest": [9999],
            "host": [10000, 10001],
            "arbiter": [10002],
        },
        "backend": 0,
        "work_mode": 0,
    }))?;
    let guest = conf.parties[&Role::Guest][0];
    let hosts = conf.parties[&Role::Host].clone();

    let stages = StageRegistry::builtin();
    let mut pipeline = Pipeline::new();
    pipeline.set_initiator(Role::Guest, guest)?;
    pipeline.set_roles(conf.parties.clone())?;

    // ========================================================================
    // Step 1: Readers - each party reads its own private dataset
    // ========================================================================

    for i in 0..2 {
        let name = format!("reader_{i}");
        pipeline.add_component(Component::new(&name, stages.get("reader")?), Inputs::new())?;
        pipeline.configure_for_party(&name, Role::Guest, guest, table("breast_hetero_guest"))?;
        for host in &hosts {
            pipeline.configure_for_party(&name, Role::Host, *host, table("breast_hetero_host"))?;
        }
    }

    // ========================================================================
    // Step 2: Data-io - only the guest holds labels
    // ========================================================================

    pipeline.add_component(
        Component::new("dataio_0", stages.get("data_io")?),
        Inputs::new().data(pipeline.output("reader_0", "data")?),
    )?;
    pipeline.configure_for_party(
        "dataio_0",
        Role::Guest,
        guest,
        BTreeMap::from([
            ("with_label".to_string(), json!(true)),
            ("output_format".to_string(), json!("dense")),
        ]),
    )?;
    for host in &hosts {
        pipeline.configure_for_party(
            "dataio_0",
            Role::Host,
            *host,
            BTreeMap::from([("with_label".to_string(), json!(false))]),
        )?;
    }

    // The validate-side data-io reuses the train-side model.
    pipeline.add_component(
        Component::new("dataio_1", stages.get("data_io")?),
        Inputs::new()
            .data(pipeline.output("reader_1", "data")?)
            .model(pipeline.output("dataio_0", "model")?),
    )?;

    // ========================================================================
    // Step 3: Intersections and the trainer
    // ========================================================================

    for i in 0..2 {
        pipeline.add_component(
            Component::new(format!("intersection_{i}"), stages.get("intersection")?),
            Inputs::new().data(pipeline.output(&format!("dataio_{i}"), "data")?),
        )?;
    }

    pipeline.add_component(
        Component::new("hetero_lr_0", stages.get("hetero_lr")?)
            .with_param("penalty", "L2")
            .with_param("optimizer", "sgd")
            .with_param("early_stop", "weight_diff")
            .with_param("early_stopping_rounds", 3)
            .with_param("validation_freqs", 1)
            .with_param("max_iter", 10),
        Inputs::new()
            .train_data(pipeline.output("intersection_0", "data")?)
            .validate_data(pipeline.output("intersection_1", "data")?),
    )?;

    // ========================================================================
    // Step 4: Compile, fit, inspect
    // ========================================================================

    let compiled = pipeline.compile()?;
    println!("--- job conf ---\n{}", compiled.conf_json()?);
    println!("--- job dsl ---\n{}", compiled.dsl_json()?);

    let submitter = JobSubmitter::new(Arc::new(LocalBackend::new()));
    let handle = pipeline
        .fit(&submitter, conf.backend()?, conf.work_mode()?)
        .await?;

    println!("job '{}' finished: {}", handle.job_id(), handle.status());
    println!("trainer summary: {:?}", handle.summary("hetero_lr_0")?);
    Ok(())
}
