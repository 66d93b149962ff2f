use aws_config::SdkConfig;
use aws_types::region::Region;

use crate::regions::CERTIFICATE_REGION;

/// credentials come from the usual environment / profile chain,
/// the region is always the one the stack asks for.
pub async fn sdk_config(region: &str) -> SdkConfig {
    aws_config::from_env()
        .region(Region::new(region.to_string()))
        .load()
        .await
}

pub async fn cloudformation(region: &str) -> aws_sdk_cloudformation::Client {
    aws_sdk_cloudformation::Client::new(&sdk_config(region).await)
}

pub async fn s3(region: &str) -> aws_sdk_s3::Client {
    aws_sdk_s3::Client::new(&sdk_config(region).await)
}

/// route53 and cloudfront are global services served out of us-east-1.
pub async fn route53() -> aws_sdk_route53::Client {
    aws_sdk_route53::Client::new(&sdk_config(CERTIFICATE_REGION).await)
}

pub async fn cloudfront() -> aws_sdk_cloudfront::Client {
    aws_sdk_cloudfront::Client::new(&sdk_config(CERTIFICATE_REGION).await)
}
