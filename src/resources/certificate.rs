use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CertificateValidationMethod {
    #[serde(rename = "DNS")]
    Dns,
    #[serde(rename = "EMAIL")]
    Email,
}

impl Default for CertificateValidationMethod {
    fn default() -> Self {
        CertificateValidationMethod::Dns
    }
}

/// with a hosted zone id, cloudformation writes the validation CNAME
/// into the zone itself and waits until the certificate is issued.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainValidationOption {
    pub domain_name: StrVal,
    pub hosted_zone_id: StrVal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnCertificate {
    /// the domain you're requesting a certificate for. Must be fully qualified. Can have 1 optional wildcard.
    /// Examples of valid values:
    /// - www.mysite.com
    /// - multiple.sub.domains.mysite.com
    /// - mysite.com
    /// - *.mysite.com
    /// Examples of invalid values:
    /// - *.something.*.mysite.com
    /// - cannotendwithdot.com.
    pub domain_name: StrVal,
    pub validation_method: CertificateValidationMethod,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub domain_validation_options: Vec<DomainValidationOption>,
}

impl CfnCertificate {
    pub fn dns_validated(domain_name: &str, hosted_zone_id: &str) -> Self {
        Self {
            domain_name: domain_name.into(),
            validation_method: CertificateValidationMethod::Dns,
            domain_validation_options: vec![DomainValidationOption {
                domain_name: domain_name.into(),
                hosted_zone_id: hosted_zone_id.into(),
            }],
        }
    }
}

impl CfnResource for CfnCertificate {
    fn type_string(&self) -> &'static str {
        "AWS::CertificateManager::Certificate"
    }

    fn properties(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(domain) = self.domain_name.as_literal() {
            validate_certificate_domain(domain)?;
        }
        for option in self.domain_validation_options.iter() {
            if option.hosted_zone_id.is_empty() {
                return Err("Domain validation options must provide a hosted zone id".into());
            }
        }
        Ok(())
    }
}

pub fn validate_certificate_domain(domain_name: &str) -> Result<(), String> {
    if domain_name.is_empty() {
        return Err("Must provide a domain name".into());
    }
    if domain_name.ends_with('.') {
        return Err(format!("Domain must not end with a dot. {} is invalid.", domain_name));
    }
    if domain_name.contains('*') {
        if domain_name.matches('*').count() > 1 {
            return Err(format!("Must only provide 1 wildcard. {} is invalid.", domain_name));
        }
        if !domain_name.starts_with("*.") {
            return Err(format!("If using a wildcard, it must be the first component of your domain, eg: \"*.something.com\". {} is invalid.", domain_name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn wildcard_rules() {
        assert!(validate_certificate_domain("www.mysite.com").is_ok());
        assert!(validate_certificate_domain("*.mysite.com").is_ok());
        assert!(validate_certificate_domain("").is_err());
        assert!(validate_certificate_domain("cannotendwithdot.com.").is_err());
        assert!(validate_certificate_domain("*.something.*.mysite.com").unwrap_err().contains("Must only provide 1 wildcard"));
        assert!(validate_certificate_domain("www.*.mysite.com").unwrap_err().contains("first component"));
    }

    #[test]
    fn dns_validated_cert_points_at_zone() {
        let cert = CfnCertificate::dns_validated("www.example.com", "Z0123");
        assert!(cert.validate().is_ok());
        assert_eq!(cert.properties(), json!({
            "DomainName": "www.example.com",
            "ValidationMethod": "DNS",
            "DomainValidationOptions": [{ "DomainName": "www.example.com", "HostedZoneId": "Z0123" }],
        }));
        let missing_zone = CfnCertificate::dns_validated("www.example.com", "");
        assert!(missing_zone.validate().is_err());
    }
}
