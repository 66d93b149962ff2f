use super::*;

/// managed "CachingOptimized" policy.
/// https://docs.aws.amazon.com/AmazonCloudFront/latest/DeveloperGuide/using-managed-cache-policies.html#managed-cache-caching-optimized
pub const CACHING_OPTIMIZED_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OriginProtocolPolicy {
    #[serde(rename = "http-only")]
    HttpOnly,
    #[serde(rename = "match-viewer")]
    MatchViewer,
    #[serde(rename = "https-only")]
    HttpsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewerProtocolPolicy {
    #[serde(rename = "allow-all")]
    AllowAll,
    #[serde(rename = "redirect-to-https")]
    RedirectToHttps,
    #[serde(rename = "https-only")]
    HttpsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SslSupportMethod {
    #[serde(rename = "sni-only")]
    Sni,
    #[serde(rename = "vip")]
    Vip,
    #[serde(rename = "static-ip")]
    StaticIp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SecurityPolicyProtocol {
    #[serde(rename = "SSLv3")]
    SslV3,
    #[serde(rename = "TLSv1")]
    TlsV1,
    #[serde(rename = "TLSv1_2016")]
    TlsV1_2016,
    #[serde(rename = "TLSv1.1_2016")]
    TlsV1_1_2016,
    #[serde(rename = "TLSv1.2_2018")]
    TlsV1_2_2018,
    #[serde(rename = "TLSv1.2_2019")]
    TlsV1_2_2019,
    #[serde(rename = "TLSv1.2_2021")]
    TlsV1_2_2021,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceClass {
    #[serde(rename = "PriceClass_100")]
    PriceClass100,
    #[serde(rename = "PriceClass_200")]
    PriceClass200,
    #[serde(rename = "PriceClass_All")]
    PriceClassAll,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomOriginConfig {
    #[serde(rename = "HTTPPort")]
    pub http_port: u16,
    #[serde(rename = "HTTPSPort")]
    pub https_port: u16,
    pub origin_protocol_policy: OriginProtocolPolicy,
    #[serde(rename = "OriginSSLProtocols")]
    pub origin_ssl_protocols: Vec<String>,
}

impl Default for CustomOriginConfig {
    fn default() -> Self {
        Self {
            http_port: 80,
            https_port: 443,
            origin_protocol_policy: OriginProtocolPolicy::HttpOnly,
            origin_ssl_protocols: vec!["TLSv1.2".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Origin {
    pub id: String,
    pub domain_name: StrVal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_origin_config: Option<CustomOriginConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DefaultCacheBehavior {
    pub target_origin_id: String,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_policy_id: Option<String>,
    pub allowed_methods: Vec<String>,
    pub cached_methods: Vec<String>,
    pub compress: bool,
}

impl Default for DefaultCacheBehavior {
    fn default() -> Self {
        Self {
            target_origin_id: String::new(),
            viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
            cache_policy_id: Some(CACHING_OPTIMIZED_POLICY_ID.to_string()),
            allowed_methods: vec!["GET".to_string(), "HEAD".to_string()],
            cached_methods: vec!["GET".to_string(), "HEAD".to_string()],
            compress: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ViewerCertificate {
    pub acm_certificate_arn: StrVal,
    pub ssl_support_method: SslSupportMethod,
    pub minimum_protocol_version: SecurityPolicyProtocol,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DistributionConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<StrVal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_root_object: Option<String>,
    pub default_cache_behavior: DefaultCacheBehavior,
    pub enabled: bool,
    pub http_version: String,
    #[serde(rename = "IPV6Enabled")]
    pub ipv6_enabled: bool,
    pub origins: Vec<Origin>,
    pub price_class: PriceClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_certificate: Option<ViewerCertificate>,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            aliases: vec![],
            comment: None,
            default_root_object: None,
            default_cache_behavior: Default::default(),
            enabled: true,
            http_version: "http2".to_string(),
            ipv6_enabled: true,
            origins: vec![],
            price_class: PriceClass::PriceClass100,
            viewer_certificate: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnDistribution {
    pub distribution_config: DistributionConfig,
}

impl CfnResource for CfnDistribution {
    fn type_string(&self) -> &'static str {
        "AWS::CloudFront::Distribution"
    }

    fn properties(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn validate(&self) -> Result<(), String> {
        let config = &self.distribution_config;
        if config.origins.is_empty() {
            return Err("Distribution must have at least one origin".into());
        }
        for origin in config.origins.iter() {
            if origin.id.is_empty() {
                return Err("Every origin must have an id".into());
            }
            if origin.domain_name.is_empty() {
                return Err(format!("Origin {} is missing a domain name", origin.id));
            }
        }
        let target = &config.default_cache_behavior.target_origin_id;
        if !config.origins.iter().any(|o| &o.id == target) {
            return Err(format!("Default cache behavior targets origin {:?} which does not exist", target));
        }
        if !config.aliases.is_empty() && config.viewer_certificate.is_none() {
            return Err("Distributions with aliases must provide a viewer certificate".into());
        }
        Ok(())
    }
}
