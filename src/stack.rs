use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::cfn::{CfnResource, DeletionPolicy, verify_logical_id};
use crate::error::{Error, Result};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

pub struct Resource {
    pub name: String,
    pub properties: Box<dyn CfnResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedResource {
    #[serde(rename = "Type")]
    pub ty: String,
    #[serde(rename = "Properties")]
    pub properties: Value,
    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none", default)]
    pub deletion_policy: Option<DeletionPolicy>,
    #[serde(rename = "UpdateReplacePolicy", skip_serializing_if = "Option::is_none", default)]
    pub update_replace_policy: Option<DeletionPolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateParameter {
    #[serde(rename = "Type")]
    pub ty: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceOutput {
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Value")]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTemplate {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub version: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(rename = "Parameters", skip_serializing_if = "BTreeMap::is_empty", default)]
    pub parameters: BTreeMap<String, TemplateParameter>,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, SavedResource>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty", default)]
    pub outputs: BTreeMap<String, ResourceOutput>,
}

impl Default for SavedTemplate {
    fn default() -> Self {
        Self {
            version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: None,
            parameters: Default::default(),
            resources: Default::default(),
            outputs: Default::default(),
        }
    }
}

/// a template parameter whose value is the output of a stack deployed earlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSource {
    pub parameter: String,
    pub stack: String,
    pub output: String,
}

#[derive(Default)]
pub struct Input {
    /// if left empty, `validate_stack_name` falls back to the app name.
    pub stack_name: String,
    pub region: String,
    pub description: Option<String>,
    pub resources: Vec<Resource>,
    pub parameters: Vec<(String, TemplateParameter)>,
    pub parameter_sources: Vec<ParameterSource>,
    pub outputs: Vec<(String, ResourceOutput)>,
}

impl Input {
    pub fn new(stack_name: &str, region: &str) -> Self {
        Self {
            stack_name: stack_name.to_string(),
            region: region.to_string(),
            ..Default::default()
        }
    }

    pub fn add_resource<R: CfnResource + 'static>(&mut self, name: &str, properties: R) {
        self.resources.push(Resource {
            name: name.to_string(),
            properties: Box::new(properties) as _,
        });
    }

    pub fn add_output(&mut self, key: &str, description: &str, value: Value) {
        self.outputs.push((key.to_string(), ResourceOutput {
            description: description.to_string(),
            value,
        }));
    }

    /// declares a string parameter filled from `stack`'s `output` at deploy time.
    pub fn add_parameter_from_output(&mut self, parameter: &str, description: &str, stack: &str, output: &str) {
        self.parameters.push((parameter.to_string(), TemplateParameter {
            ty: "String".to_string(),
            description: Some(description.to_string()),
        }));
        self.parameter_sources.push(ParameterSource {
            parameter: parameter.to_string(),
            stack: stack.to_string(),
            output: output.to_string(),
        });
    }
}

pub fn validate_resources_to_template(input: &Input) -> Result<SavedTemplate> {
    let mut out_template = SavedTemplate::default();
    out_template.description = input.description.clone();
    for resource in input.resources.iter() {
        let validation_err = |reason: String| Error::Validation {
            resource: resource.name.clone(),
            reason,
        };
        verify_logical_id(&resource.name).map_err(validation_err)?;
        resource.properties.validate().map_err(validation_err)?;
        if out_template.resources.contains_key(&resource.name) {
            return Err(validation_err("Duplicate logical id".to_string()));
        }
        let policy = resource.properties.deletion_policy();
        let saved_resource = SavedResource {
            ty: resource.properties.type_string().to_string(),
            properties: resource.properties.properties(),
            deletion_policy: policy,
            update_replace_policy: policy,
        };
        out_template.resources.insert(resource.name.clone(), saved_resource);
    }
    for (name, parameter) in input.parameters.iter() {
        verify_logical_id(name).map_err(|reason| Error::Validation { resource: name.clone(), reason })?;
        out_template.parameters.insert(name.clone(), parameter.clone());
    }
    for (name, output) in input.outputs.iter() {
        verify_logical_id(name).map_err(|reason| Error::Validation { resource: name.clone(), reason })?;
        out_template.outputs.insert(name.clone(), output.clone());
    }
    Ok(out_template)
}

pub fn validate_stack_name(app_name: &str, current_stack_name: &str) -> Result<String> {
    let stack_name = if current_stack_name.is_empty() {
        let mut stack_name = app_name.to_string();
        stack_name = stack_name.replace("_", "-");
        stack_name.truncate(128);
        stack_name
    } else {
        current_stack_name.to_string()
    };
    // A stack name can contain only alphanumeric characters (case sensitive) and hyphens.
    // It must start with an alphabetical character and can't be longer than 128 characters.
    let invalid = || Error::InvalidStackName {
        name: stack_name.clone(),
        reason: "Must only consist of alphanumeric characters and hyphens, Must start with an alphabetical character, and cannot be longer than 128 characters.".to_string(),
    };
    match stack_name.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err(invalid()),
    }
    if !stack_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid());
    }
    if stack_name.len() > 128 {
        return Err(invalid());
    }
    Ok(stack_name)
}
