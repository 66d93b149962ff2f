use super::*;
use serde_json::json;

use crate::config::SiteConfig;
use crate::regions::CERTIFICATE_REGION;
use crate::stack;

pub mod logical_ids {
    pub const BUCKET: &str = "SiteBucket";
    pub const BUCKET_POLICY: &str = "SiteBucketPolicy";
    pub const CERTIFICATE: &str = "SiteCertificate";
    pub const DISTRIBUTION: &str = "SiteDistribution";
    pub const ALIAS_RECORD: &str = "SiteAliasRecord";
    /// site stack parameter holding the ARN when the certificate is in its own stack
    pub const CERTIFICATE_ARN_PARAMETER: &str = "SiteCertificateArn";
}

pub mod outputs {
    pub const SITE: &str = "Site";
    pub const BUCKET: &str = "Bucket";
    pub const CERTIFICATE: &str = "Certificate";
    pub const DISTRIBUTION_ID: &str = "DistributionId";
    /// output of the certificate stack
    pub const CERTIFICATE_ARN: &str = "CertificateArn";
}

const DEFAULT_ORIGIN_ID: &str = "origin1";

/// Static site infrastructure: a public website bucket served over HTTPS by a
/// cloudfront distribution, with an ACM certificate and a route53 alias record
/// for `subdomain.domain`.
pub struct StaticSite<'a> {
    conf: &'a SiteConfig,
    hosted_zone_id: String,
}

impl<'a> StaticSite<'a> {
    pub fn new(conf: &'a SiteConfig, hosted_zone_id: &str) -> Self {
        Self {
            conf,
            hosted_zone_id: hosted_zone_id.to_string(),
        }
    }

    /// the stacks to deploy, in order. Only one unless the site is
    /// outside us-east-1, in which case the certificate stack comes first.
    pub fn build(&self) -> Vec<stack::Input> {
        let conf = self.conf;
        let site_domain = conf.site_domain();
        let mut out = vec![];

        let mut site = stack::Input::new(&conf.stack_name, &conf.region);
        site.description = Some(format!("Static site infrastructure for {site_domain}"));
        site.add_output(outputs::SITE, "URL of the site", json!(conf.site_url()));

        site.add_resource(logical_ids::BUCKET, self.bucket());
        site.add_resource(logical_ids::BUCKET_POLICY, CfnBucketPolicy::public_read(logical_ids::BUCKET));
        site.add_output(outputs::BUCKET, "Name of the bucket holding the site content", get_ref(logical_ids::BUCKET));

        let certificate = CfnCertificate::dns_validated(&site_domain, &self.hosted_zone_id);
        let certificate_arn = if conf.needs_certificate_stack() {
            let cert_stack_name = conf.certificate_stack_name();
            let mut cert_stack = stack::Input::new(&cert_stack_name, CERTIFICATE_REGION);
            cert_stack.description = Some(format!("CloudFront certificate for {site_domain}"));
            cert_stack.add_resource(logical_ids::CERTIFICATE, certificate);
            cert_stack.add_output(outputs::CERTIFICATE_ARN, "ARN of the site certificate", get_ref(logical_ids::CERTIFICATE));
            out.push(cert_stack);

            site.add_parameter_from_output(
                logical_ids::CERTIFICATE_ARN_PARAMETER,
                "ARN of the us-east-1 certificate for the distribution",
                &cert_stack_name,
                outputs::CERTIFICATE_ARN,
            );
            get_ref(logical_ids::CERTIFICATE_ARN_PARAMETER)
        } else {
            site.add_resource(logical_ids::CERTIFICATE, certificate);
            get_ref(logical_ids::CERTIFICATE)
        };
        site.add_output(outputs::CERTIFICATE, "ARN of the site certificate", certificate_arn.clone());

        site.add_resource(logical_ids::DISTRIBUTION, self.distribution(certificate_arn));
        site.add_output(outputs::DISTRIBUTION_ID, "Id of the cloudfront distribution", get_ref(logical_ids::DISTRIBUTION));

        site.add_resource(
            logical_ids::ALIAS_RECORD,
            CfnRecordSet::cloudfront_alias(&site_domain, &self.hosted_zone_id, logical_ids::DISTRIBUTION),
        );

        out.push(site);
        out
    }

    fn bucket(&self) -> CfnBucket {
        CfnBucket {
            bucket_name: self.conf.site_domain().into(),
            website_configuration: Some(WebsiteConfiguration {
                index_document: self.conf.index_document.clone().into(),
                error_document: Some(self.conf.error_document.clone().into()),
            }),
            // public read is granted by policy, ACLs stay blocked.
            public_access_block_configuration: Some(PublicAccessBlockConfiguration {
                block_public_acls: true,
                ignore_public_acls: true,
                block_public_policy: false,
                restrict_public_buckets: false,
            }),
            // deleting the stack deletes the bucket. Fails if the bucket still has objects.
            removal_policy: Some(DeletionPolicy::Delete),
        }
    }

    fn distribution(&self, certificate_arn: Value) -> CfnDistribution {
        CfnDistribution {
            distribution_config: DistributionConfig {
                aliases: vec![self.conf.site_domain().into()],
                // the website endpoint serves index documents itself
                default_root_object: Some(String::new()),
                origins: vec![Origin {
                    id: DEFAULT_ORIGIN_ID.to_string(),
                    domain_name: website_domain_name(logical_ids::BUCKET).into(),
                    // website endpoints only speak http
                    custom_origin_config: Some(CustomOriginConfig {
                        origin_protocol_policy: OriginProtocolPolicy::HttpOnly,
                        ..Default::default()
                    }),
                }],
                default_cache_behavior: DefaultCacheBehavior {
                    target_origin_id: DEFAULT_ORIGIN_ID.to_string(),
                    viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
                    ..Default::default()
                },
                viewer_certificate: Some(ViewerCertificate {
                    acm_certificate_arn: certificate_arn.into(),
                    ssl_support_method: SslSupportMethod::Sni,
                    minimum_protocol_version: SecurityPolicyProtocol::TlsV1_1_2016,
                }),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::Context;
    use crate::stack::validate_resources_to_template;

    fn conf(region: &str) -> SiteConfig {
        let mut ctx = Context::new();
        ctx.set("domain", "example.com");
        ctx.set("subdomain", "www");
        ctx.set("region", region);
        SiteConfig::from_context(&ctx).unwrap()
    }

    #[test]
    fn single_stack_in_certificate_region() {
        let conf = conf("us-east-1");
        let stacks = StaticSite::new(&conf, "Z0123").build();
        assert_eq!(stacks.len(), 1);
        let template = validate_resources_to_template(&stacks[0]).unwrap();
        let names: Vec<&str> = template.resources.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["SiteAliasRecord", "SiteBucket", "SiteBucketPolicy", "SiteCertificate", "SiteDistribution"]);
        assert!(template.parameters.is_empty());

        let distr = &template.resources["SiteDistribution"].properties["DistributionConfig"];
        assert_eq!(distr["ViewerCertificate"]["AcmCertificateArn"], json!({ "Ref": "SiteCertificate" }));
        assert_eq!(distr["Aliases"], json!(["www.example.com"]));
        assert_eq!(distr["DefaultRootObject"], "");
        assert_eq!(distr["Origins"][0]["DomainName"], json!({
            "Fn::Select": ["2", { "Fn::Split": ["/", { "Fn::GetAtt": ["SiteBucket", "WebsiteURL"] }] }]
        }));

        let outputs: Vec<&str> = template.outputs.keys().map(|k| k.as_str()).collect();
        assert_eq!(outputs, vec!["Bucket", "Certificate", "DistributionId", "Site"]);
        assert_eq!(template.outputs["Site"].value, "https://www.example.com");
    }

    #[test]
    fn bucket_is_a_public_website_named_after_the_site() {
        let conf = conf("us-east-1");
        let stacks = StaticSite::new(&conf, "Z0123").build();
        let template = validate_resources_to_template(&stacks[0]).unwrap();
        let bucket = &template.resources["SiteBucket"];
        assert_eq!(bucket.properties["BucketName"], "www.example.com");
        assert_eq!(bucket.properties["WebsiteConfiguration"], json!({ "IndexDocument": "index.html", "ErrorDocument": "404.html" }));
        assert_eq!(bucket.properties["PublicAccessBlockConfiguration"]["BlockPublicPolicy"], false);
        assert_eq!(bucket.deletion_policy, Some(DeletionPolicy::Delete));

        let record = &template.resources["SiteAliasRecord"].properties;
        assert_eq!(record["Name"], "www.example.com.");
        assert_eq!(record["HostedZoneId"], "Z0123");
        assert_eq!(record["AliasTarget"]["HostedZoneId"], CLOUDFRONT_HOSTED_ZONE_ID);

        let cert = &template.resources["SiteCertificate"].properties;
        assert_eq!(cert["DomainValidationOptions"][0]["HostedZoneId"], "Z0123");
    }

    #[test]
    fn other_regions_get_a_certificate_stack_first() {
        let conf = conf("eu-central-1");
        let stacks = StaticSite::new(&conf, "Z0123").build();
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[0].stack_name, "MyStaticSite-certificate");
        assert_eq!(stacks[0].region, "us-east-1");
        assert_eq!(stacks[1].stack_name, "MyStaticSite");
        assert_eq!(stacks[1].region, "eu-central-1");

        let cert_template = validate_resources_to_template(&stacks[0]).unwrap();
        assert_eq!(cert_template.resources.len(), 1);
        assert!(cert_template.outputs.contains_key("CertificateArn"));

        let site_template = validate_resources_to_template(&stacks[1]).unwrap();
        assert!(!site_template.resources.contains_key("SiteCertificate"));
        assert!(site_template.parameters.contains_key("SiteCertificateArn"));
        let distr = &site_template.resources["SiteDistribution"].properties["DistributionConfig"];
        assert_eq!(distr["ViewerCertificate"]["AcmCertificateArn"], json!({ "Ref": "SiteCertificateArn" }));
        assert_eq!(stacks[1].parameter_sources[0].output, "CertificateArn");
    }
}
