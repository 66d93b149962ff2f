use super::*;

/// static for all of AWS for aliases to CloudFront
/// see here: https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-properties-route53-aliastarget.html#cfn-route53-aliastarget-hostedzoneid
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AliasTarget {
    #[serde(rename = "DNSName")]
    pub dns_name: StrVal,
    pub hosted_zone_id: StrVal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnRecordSet {
    pub name: StrVal,
    #[serde(rename = "Type")]
    pub record_type: String,
    pub hosted_zone_id: StrVal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_target: Option<AliasTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl CfnRecordSet {
    /// an `A` alias record pointing `name` at a cloudfront distribution.
    pub fn cloudfront_alias(name: &str, hosted_zone_id: &str, logical_distr_name: &str) -> Self {
        Self {
            name: fully_qualified(name).into(),
            record_type: "A".to_string(),
            hosted_zone_id: hosted_zone_id.into(),
            alias_target: Some(AliasTarget {
                dns_name: get_att(logical_distr_name, "DomainName").into(),
                hosted_zone_id: CLOUDFRONT_HOSTED_ZONE_ID.into(),
            }),
            comment: None,
        }
    }
}

impl CfnResource for CfnRecordSet {
    fn type_string(&self) -> &'static str {
        "AWS::Route53::RecordSet"
    }

    fn properties(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Route53 record must have a name. Example mysubdomain.mywebsite.com".into());
        }
        if self.hosted_zone_id.is_empty() {
            return Err("Route53 record must have a hosted zone id".into());
        }
        match self.record_type.as_str() {
            "A" | "AAAA" | "CNAME" | "TXT" | "MX" | "NS" | "SRV" | "CAA" => {}
            x => return Err(format!("Unsupported record type {x}")),
        }
        if let Some(alias) = &self.alias_target {
            if alias.dns_name.is_empty() || alias.hosted_zone_id.is_empty() {
                return Err("Alias target must have a dns name and a hosted zone id".into());
            }
        }
        Ok(())
    }
}

/// route53 names must end in '.'
pub fn fully_qualified(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}
