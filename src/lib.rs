//! Declares the infrastructure of a static website and deploys it with
//! CloudFormation: a website bucket, a CloudFront distribution in front of it,
//! a DNS validated certificate and an alias record in the domain's hosted zone.

pub mod error;
pub mod regions;
pub mod cfn;
pub mod resources;
pub mod stack;
pub mod context;
pub mod config;
pub mod synth;
pub mod clients;
pub mod deploy;
pub mod assets;
pub mod hosted_zone;

pub use error::{Error, Result};
pub use config::SiteConfig;
pub use synth::{synthesize, Assembly};
