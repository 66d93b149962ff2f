//! Turns the site configuration into ready to deploy templates.

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::config::SiteConfig;
use crate::error::Result;
use crate::resources::StaticSite;
use crate::stack::{validate_resources_to_template, ParameterSource, SavedTemplate};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone)]
pub struct StackArtifact {
    pub name: String,
    pub region: String,
    pub template: SavedTemplate,
    pub parameter_sources: Vec<ParameterSource>,
}

impl StackArtifact {
    pub fn template_file_name(&self) -> String {
        format!("{}.template.json", self.name)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub stack_name: String,
    pub region: String,
    pub template_file: String,
    #[serde(default)]
    pub parameter_sources: Vec<ParameterSource>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub stacks: Vec<ManifestEntry>,
}

/// stacks in deployment order.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub stacks: Vec<StackArtifact>,
}

impl Assembly {
    pub fn stack(&self, name: &str) -> Option<&StackArtifact> {
        self.stacks.iter().find(|s| s.name == name)
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            version: env!("CARGO_PKG_VERSION").to_string(),
            stacks: self.stacks.iter().map(|s| ManifestEntry {
                stack_name: s.name.clone(),
                region: s.region.clone(),
                template_file: s.template_file_name(),
                parameter_sources: s.parameter_sources.clone(),
            }).collect(),
        }
    }

    /// writes one pretty printed template per stack, plus the manifest.
    /// returns the paths of the written templates.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let mut written = vec![];
        for stack in self.stacks.iter() {
            let path = dir.join(stack.template_file_name());
            // we make it pretty so if a user needs to look at the stack in Cfn console, it looks nice
            let body = serde_json::to_string_pretty(&stack.template)?;
            std::fs::write(&path, body)?;
            debug!("wrote {:?}", path);
            written.push(path);
        }
        let manifest = serde_json::to_string_pretty(&self.manifest())?;
        std::fs::write(dir.join(MANIFEST_FILE), manifest)?;
        Ok(written)
    }
}

pub fn synthesize(conf: &SiteConfig, hosted_zone_id: &str) -> Result<Assembly> {
    let inputs = StaticSite::new(conf, hosted_zone_id).build();
    let mut stacks = vec![];
    for input in inputs.iter() {
        let template = validate_resources_to_template(input)?;
        info!(stack = %input.stack_name, region = %input.region, resources = template.resources.len(), "synthesized stack");
        stacks.push(StackArtifact {
            name: input.stack_name.clone(),
            region: input.region.clone(),
            template,
            parameter_sources: input.parameter_sources.clone(),
        });
    }
    Ok(Assembly { stacks })
}
