use super::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebsiteConfiguration {
    pub index_document: StrVal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_document: Option<StrVal>,
}

impl Default for WebsiteConfiguration {
    fn default() -> Self {
        Self {
            index_document: "index.html".into(),
            error_document: Some("404.html".into()),
        }
    }
}

/// every field defaults to true in S3, which blocks the public read
/// policy a website bucket needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicAccessBlockConfiguration {
    pub block_public_acls: bool,
    pub block_public_policy: bool,
    pub ignore_public_acls: bool,
    pub restrict_public_buckets: bool,
}

impl Default for PublicAccessBlockConfiguration {
    fn default() -> Self {
        Self {
            block_public_acls: true,
            block_public_policy: true,
            ignore_public_acls: true,
            restrict_public_buckets: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnBucket {
    /// if left empty cloudformation generates a name from the logical id.
    #[serde(skip_serializing_if = "StrVal::is_empty")]
    pub bucket_name: StrVal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_configuration: Option<WebsiteConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_access_block_configuration: Option<PublicAccessBlockConfiguration>,

    /// not a property. Becomes the resource's DeletionPolicy / UpdateReplacePolicy.
    #[serde(skip)]
    pub removal_policy: Option<DeletionPolicy>,
}

impl CfnResource for CfnBucket {
    fn type_string(&self) -> &'static str {
        "AWS::S3::Bucket"
    }

    fn properties(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(name) = self.bucket_name.as_literal() {
            if !name.is_empty() {
                validate_bucket_name(name)?;
            }
        }
        if let Some(website) = &self.website_configuration {
            if website.index_document.is_empty() {
                return Err("Website configuration must have an index document".into());
            }
        }
        Ok(())
    }

    fn deletion_policy(&self) -> Option<DeletionPolicy> {
        self.removal_policy
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnBucketPolicy {
    pub bucket: StrVal,
    pub policy_document: Value,
}

impl CfnBucketPolicy {
    /// allows anyone to read every object of the bucket
    pub fn public_read(logical_bucket_name: &str) -> Self {
        let objects = sub(&format!("arn:aws:s3:::${{{}}}/*", logical_bucket_name));
        Self {
            bucket: StrVal::Val(get_ref(logical_bucket_name)),
            policy_document: create_policy_doc(&[
                ("Allow".to_string(), "s3:GetObject".to_string(), StrVal::Val(objects), "*".into()),
            ]),
        }
    }
}

impl CfnResource for CfnBucketPolicy {
    fn type_string(&self) -> &'static str {
        "AWS::S3::BucketPolicy"
    }

    fn properties(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn validate(&self) -> Result<(), String> {
        if self.bucket.is_empty() {
            return Err("Bucket policy must reference a bucket".into());
        }
        Ok(())
    }
}

/// the host name of the bucket's website endpoint, eg:
/// `www.example.com.s3-website.eu-central-1.amazonaws.com`.
/// `WebsiteURL` includes the scheme, so we split it off:
/// { "Fn::Select" : [ "2", { "Fn::Split": ["/", { "Fn::GetAtt": [id, "WebsiteURL"] }] } ] }
pub fn website_domain_name(logical_bucket_name: &str) -> Value {
    select(2, split("/", get_att(logical_bucket_name, "WebsiteURL")))
}

pub fn validate_bucket_name(name: &str) -> Result<(), String> {
    if name.len() > 63 || name.len() < 3 {
        return Err(format!("Invalid bucket name {:?}\nMust be between 3 and 63 characters", name));
    }
    let valid_char_check = |c: char| -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-'
    };
    if !name.chars().all(valid_char_check) {
        return Err(format!("Invalid bucket name {:?}\nMay only contain lowercase letters, numbers, dots, and dashes", name));
    }
    let first_ok = name.chars().next().map_or(false, |c| c.is_ascii_alphanumeric());
    let last_ok = name.chars().last().map_or(false, |c| c.is_ascii_alphanumeric());
    if !first_ok || !last_ok {
        return Err(format!("Invalid bucket name {:?}\nFirst and last character must be either lowercase letter, or number", name));
    }
    if name.contains("..") {
        return Err(format!("Invalid bucket name {:?}\nMay not contain two consecutive dots", name));
    }
    if name.parse::<std::net::Ipv4Addr>().is_ok() {
        return Err(format!("Invalid bucket name {:?}\nMay not be formatted as an IP address", name));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn bucket_name_rules() {
        assert!(validate_bucket_name("www.example.com").is_ok());
        assert!(validate_bucket_name("ab").unwrap_err().contains("Must be between 3 and 63 characters"));
        assert!(validate_bucket_name(&"a".repeat(64)).is_err());
        assert!(validate_bucket_name("www..example.com").unwrap_err().contains("May not contain two consecutive dots"));
        assert!(validate_bucket_name("WWW.example.com").unwrap_err().contains("lowercase"));
        assert!(validate_bucket_name("-example.com").is_err());
        assert!(validate_bucket_name("example.com.").is_err());
        assert!(validate_bucket_name("192.168.1.1").unwrap_err().contains("IP address"));
    }

    #[test]
    fn website_bucket_serializes_only_set_fields() {
        let bucket = CfnBucket {
            bucket_name: "www.example.com".into(),
            website_configuration: Some(Default::default()),
            removal_policy: Some(DeletionPolicy::Delete),
            ..Default::default()
        };
        assert!(bucket.validate().is_ok());
        assert_eq!(bucket.properties(), json!({
            "BucketName": "www.example.com",
            "WebsiteConfiguration": { "IndexDocument": "index.html", "ErrorDocument": "404.html" },
        }));
        assert_eq!(bucket.deletion_policy(), Some(DeletionPolicy::Delete));
        assert!(CfnBucket::default().validate().is_ok());
    }

    #[test]
    fn public_read_policy_targets_all_objects() {
        let policy = CfnBucketPolicy::public_read("SiteBucket");
        let props = policy.properties();
        assert_eq!(props["Bucket"], json!({ "Ref": "SiteBucket" }));
        let statement = &props["PolicyDocument"]["Statement"][0];
        assert_eq!(statement["Action"], "s3:GetObject");
        assert_eq!(statement["Principal"], "*");
        assert_eq!(statement["Resource"], json!({ "Fn::Sub": "arn:aws:s3:::${SiteBucket}/*" }));
    }
}
