pub use serde::Serialize;
pub use serde_json::Value;

pub use crate::cfn::*;

mod s3_bucket;
pub use s3_bucket::*;
mod certificate;
pub use certificate::*;
mod cloudfront;
pub use cloudfront::*;
mod route53;
pub use route53::*;

// higher level resources:
mod static_website;
pub use static_website::*;
