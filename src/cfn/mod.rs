//! Primitives shared by every resource: the resource trait, string values that
//! may hold an intrinsic function, and helpers to build the intrinsics.

use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

/// `DeletionPolicy` / `UpdateReplacePolicy` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
    Snapshot,
}

pub trait CfnResource {
    /// the cloudformation resource type, eg: `AWS::S3::Bucket`
    fn type_string(&self) -> &'static str;

    fn properties(&self) -> Value;

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn deletion_policy(&self) -> Option<DeletionPolicy> {
        None
    }
}

/// A string property. Either an actual string, or a value that cloudformation
/// resolves at deploy time (`Ref`, `Fn::GetAtt`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrVal {
    Str(String),
    Val(Value),
}

impl Default for StrVal {
    fn default() -> Self {
        StrVal::Str(String::new())
    }
}

impl StrVal {
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            StrVal::Str(s) => Some(s),
            StrVal::Val(_) => None,
        }
    }

    /// empty literals are considered missing. Intrinsics never are.
    pub fn is_empty(&self) -> bool {
        match self {
            StrVal::Str(s) => s.is_empty(),
            StrVal::Val(_) => false,
        }
    }
}

impl From<&str> for StrVal {
    fn from(value: &str) -> Self {
        StrVal::Str(value.to_string())
    }
}

impl From<String> for StrVal {
    fn from(value: String) -> Self {
        StrVal::Str(value)
    }
}

impl From<Value> for StrVal {
    fn from(value: Value) -> Self {
        StrVal::Val(value)
    }
}

fn single_key(key: &str, val: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), val);
    Value::Object(map)
}

pub fn get_ref(logical_id: &str) -> Value {
    single_key("Ref", Value::String(logical_id.to_string()))
}

pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    single_key("Fn::GetAtt", Value::Array(vec![
        Value::String(logical_id.to_string()),
        Value::String(attribute.to_string()),
    ]))
}

pub fn sub(template: &str) -> Value {
    single_key("Fn::Sub", Value::String(template.to_string()))
}

pub fn select(index: usize, list: Value) -> Value {
    single_key("Fn::Select", Value::Array(vec![
        Value::String(index.to_string()),
        list,
    ]))
}

pub fn split(delimiter: &str, source: Value) -> Value {
    single_key("Fn::Split", Value::Array(vec![
        Value::String(delimiter.to_string()),
        source,
    ]))
}

pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    single_key("Fn::Join", Value::Array(vec![
        Value::String(delimiter.to_string()),
        Value::Array(parts),
    ]))
}

/// builds an IAM policy document from (effect, action, resource, principal) statements.
/// an empty literal principal is left out of the statement.
pub fn create_policy_doc(statements: &[(String, String, StrVal, StrVal)]) -> Value {
    let mut out = vec![];
    for (effect, action, resource, principal) in statements {
        let mut statement = Map::new();
        statement.insert("Effect".to_string(), Value::String(effect.clone()));
        statement.insert("Action".to_string(), Value::String(action.clone()));
        statement.insert("Resource".to_string(), serde_json::to_value(resource).unwrap_or(Value::Null));
        if !principal.is_empty() {
            statement.insert("Principal".to_string(), serde_json::to_value(principal).unwrap_or(Value::Null));
        }
        out.push(Value::Object(statement));
    }
    let mut doc = Map::new();
    doc.insert("Version".to_string(), Value::String("2012-10-17".to_string()));
    doc.insert("Statement".to_string(), Value::Array(out));
    Value::Object(doc)
}

pub fn verify_logical_id(logical_id: &str) -> Result<(), String> {
    if logical_id.len() > 255 {
        return Err(format!("Invalid resource name {:?}\nmust be less than 255 characters", logical_id));
    }
    if logical_id.len() < 1 {
        return Err(format!("Invalid resource name {:?}\nMust contain at least 1 character", logical_id));
    }
    if !logical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(format!("Invalid resource name {:?}\nMust contain only alphanumeric characters [A-Za-z0-9]", logical_id));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn intrinsics_have_cfn_shape() {
        assert_eq!(get_ref("SiteBucket"), json!({ "Ref": "SiteBucket" }));
        assert_eq!(get_att("SiteDistribution", "DomainName"), json!({ "Fn::GetAtt": ["SiteDistribution", "DomainName"] }));
        let website = select(2, split("/", get_att("SiteBucket", "WebsiteURL")));
        assert_eq!(website, json!({
            "Fn::Select": ["2", { "Fn::Split": ["/", { "Fn::GetAtt": ["SiteBucket", "WebsiteURL"] }] }]
        }));
        assert_eq!(join("", vec![json!("https://"), get_ref("X")]), json!({ "Fn::Join": ["", ["https://", { "Ref": "X" }]] }));
    }

    #[test]
    fn strval_serializes_untagged() {
        let literal: StrVal = "index.html".into();
        assert_eq!(serde_json::to_value(&literal).unwrap(), json!("index.html"));
        let reference: StrVal = get_ref("Cert").into();
        assert_eq!(serde_json::to_value(&reference).unwrap(), json!({ "Ref": "Cert" }));
        assert!(StrVal::default().is_empty());
        assert!(!reference.is_empty());
    }

    #[test]
    fn policy_doc_skips_empty_principal() {
        let doc = create_policy_doc(&[
            ("Allow".into(), "s3:GetObject".into(), sub("arn:aws:s3:::${B}/*").into(), "*".into()),
            ("Allow".into(), "s3:ListBucket".into(), get_att("B", "Arn").into(), "".into()),
        ]);
        assert_eq!(doc["Version"], "2012-10-17");
        assert_eq!(doc["Statement"][0]["Principal"], "*");
        assert!(doc["Statement"][1].get("Principal").is_none());
    }

    #[test]
    fn logical_ids_must_be_alphanumeric() {
        assert!(verify_logical_id("SiteBucket").is_ok());
        assert!(verify_logical_id("").is_err());
        assert!(verify_logical_id("site-bucket").is_err());
        assert!(verify_logical_id(&"a".repeat(256)).is_err());
    }
}
