//! Hands synthesized templates to CloudFormation and waits for the result.
//! Change sets, rollback and drift are all left to the service.

use std::collections::BTreeMap;

use aws_sdk_cloudformation::types::{OnFailure, Parameter, Stack, StackStatus};
use aws_sdk_cloudformation::Client;
use tracing::{debug, info, warn};

use crate::assets;
use crate::clients;
use crate::config::SiteConfig;
use crate::error::{Error, Result};
use crate::synth::{Assembly, StackArtifact};

pub type StackOutputs = BTreeMap<String, String>;

const POLL_INTERVAL_MS: u64 = 700;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackProgress {
    Done,
    InProgress,
    Failed,
}

pub fn classify_status(status: &StackStatus) -> StackProgress {
    match status {
        StackStatus::DeleteComplete |
        StackStatus::CreateComplete |
        StackStatus::UpdateComplete |
        StackStatus::ImportComplete => StackProgress::Done,

        StackStatus::CreateInProgress |
        StackStatus::DeleteInProgress |
        StackStatus::ImportInProgress |
        StackStatus::ImportRollbackInProgress |
        StackStatus::ReviewInProgress |
        StackStatus::RollbackInProgress |
        StackStatus::UpdateCompleteCleanupInProgress |
        StackStatus::UpdateInProgress |
        StackStatus::UpdateRollbackCompleteCleanupInProgress |
        StackStatus::UpdateRollbackInProgress => StackProgress::InProgress,

        // RollbackComplete, UpdateRollbackComplete, *Failed, and anything newer than this sdk
        _ => StackProgress::Failed,
    }
}

fn is_missing_stack_error(e_str: &str) -> bool {
    e_str.contains("does not exist")
}

fn is_no_op_update(e_str: &str) -> bool {
    e_str.contains("No updates are to be performed")
}

/// what `create_or_update_stack` asked cloudformation to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackChange {
    Submitted,
    /// the stack already has this template, nothing will change its status.
    UpToDate,
}

impl StackChange {
    pub fn needs_wait(self) -> bool {
        self == StackChange::Submitted
    }
}

/// outcome of an UpdateStack call, with the sdk error already rendered.
pub fn update_outcome(res: std::result::Result<(), String>) -> Result<StackChange> {
    match res {
        Ok(()) => Ok(StackChange::Submitted),
        Err(e_str) if is_no_op_update(&e_str) => Ok(StackChange::UpToDate),
        Err(e_str) => Err(Error::Aws { operation: "UpdateStack".into(), message: e_str }),
    }
}

pub async fn does_stack_exist(client: &Client, name: &str) -> Result<bool> {
    match client.describe_stacks().stack_name(name).send().await {
        Ok(_) => Ok(true),
        Err(e) => {
            let e_str = format!("{:#?}", e);
            if is_missing_stack_error(&e_str) {
                return Ok(false);
            }
            Err(Error::Aws { operation: "DescribeStacks".into(), message: e_str })
        }
    }
}

/// `Some(stack)` once the stack settled, `None` while it's still working.
pub async fn describe_stack(client: &Client, name: &str) -> Result<Option<Stack>> {
    let resp = client.describe_stacks().stack_name(name).send().await
        .map_err(|e| Error::aws("DescribeStacks", e))?;
    let not_found = || Error::StackFailed { stack: name.to_string(), reason: "Stack not found".to_string() };
    let stack = resp.stacks()
        .and_then(|stacks| stacks.first())
        .ok_or_else(not_found)?;
    let status = stack.stack_status().ok_or_else(not_found)?;
    match classify_status(status) {
        StackProgress::Done => Ok(Some(stack.clone())),
        StackProgress::InProgress => {
            debug!(stack = name, status = ?status, "waiting");
            Ok(None)
        }
        StackProgress::Failed => Err(Error::StackFailed {
            stack: name.to_string(),
            reason: stack.stack_status_reason()
                .map(|r| format!("{:?}: {}", status, r))
                .unwrap_or_else(|| format!("{:?}", status)),
        }),
    }
}

pub fn collect_outputs(stack: &Stack) -> StackOutputs {
    let mut out = StackOutputs::new();
    for output in stack.outputs().unwrap_or_default() {
        if let (Some(key), Some(val)) = (output.output_key(), output.output_value()) {
            out.insert(key.to_string(), val.to_string());
        }
    }
    out
}

/// outputs of a stack that just settled. A create that failed with
/// `OnFailure::Delete` settles as deleted, which is not a deployment.
pub fn settled_outputs(name: &str, stack: &Stack) -> Result<StackOutputs> {
    if let Some(StackStatus::DeleteComplete) = stack.stack_status() {
        return Err(Error::StackFailed {
            stack: name.to_string(),
            reason: stack.stack_status_reason()
                .map(|r| format!("DeleteComplete: {r}"))
                .unwrap_or_else(|| "stack was deleted after a failed create".to_string()),
        });
    }
    Ok(collect_outputs(stack))
}

pub async fn wait_for_output(client: &Client, name: &str) -> Result<StackOutputs> {
    loop {
        let dur = tokio::time::Duration::from_millis(POLL_INTERVAL_MS);
        tokio::time::sleep(dur).await;
        if let Some(stack) = describe_stack(client, name).await? {
            return settled_outputs(name, &stack);
        }
    }
}

/// outputs as they are right now, whatever state the stack is in.
pub async fn current_outputs(client: &Client, name: &str) -> Result<StackOutputs> {
    let resp = client.describe_stacks().stack_name(name).send().await
        .map_err(|e| Error::aws("DescribeStacks", e))?;
    let stack = resp.stacks()
        .and_then(|stacks| stacks.first())
        .ok_or_else(|| Error::StackFailed { stack: name.to_string(), reason: "Stack not found".to_string() })?;
    Ok(collect_outputs(stack))
}

pub async fn create_or_update_stack(client: &Client, name: &str, body: &str, parameters: &[(String, String)]) -> Result<StackChange> {
    let params: Vec<Parameter> = parameters.iter()
        .map(|(k, v)| Parameter::builder().parameter_key(k).parameter_value(v).build())
        .collect();
    if does_stack_exist(client, name).await? {
        info!("Updating {name} ...");
        let res = client
            .update_stack()
            .stack_name(name)
            .template_body(body)
            .set_parameters(Some(params))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| format!("{:#?}", e));
        let change = update_outcome(res)?;
        if change == StackChange::UpToDate {
            info!("{name} is up to date");
        }
        Ok(change)
    } else {
        info!("Creating {name} ...");
        client
            .create_stack()
            .on_failure(OnFailure::Delete)
            .stack_name(name)
            .template_body(body)
            .set_parameters(Some(params))
            .send()
            .await
            .map_err(|e| Error::aws("CreateStack", e))?;
        Ok(StackChange::Submitted)
    }
}

pub async fn delete_stack(client: &Client, name: &str) -> Result<()> {
    if !does_stack_exist(client, name).await? {
        info!("{name} does not exist, nothing to delete");
        return Ok(());
    }
    info!("Deleting {name} ...");
    client.delete_stack().stack_name(name).send().await
        .map_err(|e| Error::aws("DeleteStack", e))?;
    wait_for_delete(client, name).await
}

pub async fn wait_for_delete(client: &Client, name: &str) -> Result<()> {
    loop {
        let dur = tokio::time::Duration::from_millis(POLL_INTERVAL_MS);
        tokio::time::sleep(dur).await;
        match describe_stack(client, name).await {
            Ok(Some(_)) => return Ok(()),
            Ok(None) => {}
            Err(Error::Aws { message, .. }) if is_missing_stack_error(&message) => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}

/// fills the template parameters of `artifact` from outputs of stacks deployed before it.
pub fn resolve_parameters(artifact: &StackArtifact, deployed: &BTreeMap<String, StackOutputs>) -> Result<Vec<(String, String)>> {
    let mut out = vec![];
    for source in artifact.parameter_sources.iter() {
        let value = deployed.get(&source.stack)
            .and_then(|outputs| outputs.get(&source.output))
            .ok_or_else(|| Error::MissingOutput {
                stack: source.stack.clone(),
                output: source.output.clone(),
            })?;
        out.push((source.parameter.clone(), value.clone()));
    }
    Ok(out)
}

/// deploys every stack in order. Returns the outputs of each stack by stack name.
pub async fn deploy_assembly(assembly: &Assembly) -> Result<BTreeMap<String, StackOutputs>> {
    let mut deployed = BTreeMap::new();
    for artifact in assembly.stacks.iter() {
        let client = clients::cloudformation(&artifact.region).await;
        let parameters = resolve_parameters(artifact, &deployed)?;
        let template_body = serde_json::to_string_pretty(&artifact.template)?;
        info!(stack = %artifact.name, region = %artifact.region, "About to deploy stack");
        let change = create_or_update_stack(&client, &artifact.name, &template_body, &parameters).await?;
        let outputs = if change.needs_wait() {
            wait_for_output(&client, &artifact.name).await?
        } else {
            current_outputs(&client, &artifact.name).await?
        };
        info!(stack = %artifact.name, "deployed");
        deployed.insert(artifact.name.clone(), outputs);
    }
    Ok(deployed)
}

/// empties the site bucket, since cloudformation refuses to delete a bucket
/// with objects in it, then deletes the stacks in reverse order.
pub async fn destroy_assembly(assembly: &Assembly, conf: &SiteConfig) -> Result<()> {
    let s3 = clients::s3(&conf.region).await;
    let bucket = conf.site_domain();
    match assets::empty_bucket(&s3, &bucket).await {
        Ok(n) => info!("removed {n} objects from {bucket}"),
        Err(Error::Aws { message, .. }) if message.contains("NoSuchBucket") => {
            warn!("bucket {bucket} does not exist, skipping cleanup");
        }
        Err(e) => return Err(e),
    }
    for artifact in assembly.stacks.iter().rev() {
        let client = clients::cloudformation(&artifact.region).await;
        delete_stack(&client, &artifact.name).await?;
    }
    Ok(())
}
