use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::regions::{verify_region, CERTIFICATE_REGION};
use crate::resources::{validate_bucket_name, validate_certificate_domain};
use crate::stack::validate_stack_name;

pub const DEFAULT_CONFIG_FILE: &str = "static-site.toml";
pub const DEFAULT_STACK_NAME: &str = "MyStaticSite";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_SOURCE_DIR: &str = "../out";
pub const DEFAULT_OUTPUT_DIR: &str = "static-site.out";

/// contents of `static-site.toml`:
/// ```toml
/// [context]
/// domain = "mystaticsite.com"
/// subdomain = "www"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl ConfigFile {
    /// a missing file is not an error, everything can come from -c instead.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.is_file() {
            debug!("no config file at {:?}", path);
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&contents)?))
    }
}

/// builds the context from config file, .env file and command line pairs, in that order.
pub fn load_context(config_path: &Path, env_path: &Path, pairs: &[String]) -> Result<Context> {
    let mut ctx = Context::new();
    if let Some(file) = ConfigFile::from_file(config_path)? {
        ctx.merge(file.context);
    }
    ctx.merge_dotenv(env_path)?;
    for pair in pairs {
        let (key, val) = Context::parse_pair(pair)?;
        ctx.set(key, val);
    }
    Ok(ctx)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub domain: String,
    pub subdomain: String,
    pub stack_name: String,
    /// region of the site stack. The certificate always goes to us-east-1.
    pub region: String,
    /// looked up in route53 when not provided.
    pub hosted_zone_id: Option<String>,
    /// build output of the static site, uploaded to the bucket on deploy.
    pub source_dir: PathBuf,
    pub index_document: String,
    pub error_document: String,
    pub output_dir: PathBuf,
}

impl SiteConfig {
    pub fn from_context(ctx: &Context) -> Result<Self> {
        let domain = ctx.get("domain")?.trim_end_matches('.').to_lowercase();
        let subdomain = ctx.get("subdomain")?.trim_matches('.').to_lowercase();
        for (key, val) in [("domain", &domain), ("subdomain", &subdomain)] {
            if val.chars().any(|c| c.is_whitespace()) || val.starts_with('.') {
                return Err(Error::InvalidContext {
                    key: key.to_string(),
                    reason: format!("{val:?} is not a valid domain name"),
                });
            }
        }
        let region = ctx.try_get("region").unwrap_or(DEFAULT_REGION).to_string();
        verify_region(&region)?;
        let stack_name = validate_stack_name(DEFAULT_STACK_NAME, ctx.try_get("stack_name").unwrap_or(""))?;

        let out = Self {
            domain,
            subdomain,
            stack_name,
            region,
            hosted_zone_id: ctx.try_get("hosted_zone_id").map(|s| s.to_string()),
            source_dir: ctx.try_get("source_dir").unwrap_or(DEFAULT_SOURCE_DIR).into(),
            index_document: ctx.try_get("index_document").unwrap_or("index.html").to_string(),
            error_document: ctx.try_get("error_document").unwrap_or("404.html").to_string(),
            output_dir: ctx.try_get("output_dir").unwrap_or(DEFAULT_OUTPUT_DIR).into(),
        };
        if out.needs_certificate_stack() {
            validate_stack_name(DEFAULT_STACK_NAME, &out.certificate_stack_name())?;
        }
        let site_domain = out.site_domain();
        validate_bucket_name(&site_domain).map_err(|reason| Error::InvalidBucketName {
            name: site_domain.clone(),
            reason,
        })?;
        validate_certificate_domain(&site_domain).map_err(|reason| Error::InvalidCertificateDomain {
            name: site_domain.clone(),
            reason,
        })?;
        Ok(out)
    }

    pub fn site_domain(&self) -> String {
        format!("{}.{}", self.subdomain, self.domain)
    }

    pub fn site_url(&self) -> String {
        format!("https://{}", self.site_domain())
    }

    /// cloudfront certificates must live in us-east-1. Anywhere else
    /// the certificate needs its own stack.
    pub fn needs_certificate_stack(&self) -> bool {
        self.region != CERTIFICATE_REGION
    }

    pub fn certificate_stack_name(&self) -> String {
        format!("{}-certificate", self.stack_name)
    }
}
