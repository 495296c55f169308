//! Deferred values
//!
//! A token stands for a value that only exists once the provisioning engine
//! has created the referenced resource (a generated id, a DNS name). Tokens
//! serialize to CloudFormation intrinsic functions.

use serde::{Serialize, Serializer};
use serde_json::{Value, json};

/// Deferred value resolved at deployment time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Plain string known at render time
    Literal(String),
    /// `{"Ref": id}`
    Ref(String),
    /// `{"Fn::GetAtt": [id, attribute]}`
    GetAtt(String, String),
    /// `{"Fn::Join": [delimiter, [parts...]]}`
    Join(String, Vec<Token>),
    /// `{"Fn::Select": [index, list]}`
    Select(usize, Box<Token>),
    /// `{"Fn::GetAZs": ""}` (availability zones of the deployment region)
    GetAzs,
}

impl Token {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Self::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt(logical_id.into(), attribute.into())
    }

    /// Concatenate parts without a delimiter
    pub fn concat(parts: Vec<Token>) -> Self {
        Self::Join(String::new(), parts)
    }

    /// `Fn::Select [index, Fn::GetAZs ""]`
    pub fn availability_zone(index: usize) -> Self {
        Self::Select(index, Box::new(Self::GetAzs))
    }

    /// Whether the value is only known after deployment
    pub fn is_deferred(&self) -> bool {
        match self {
            Self::Literal(_) => false,
            Self::Join(_, parts) => parts.iter().any(Token::is_deferred),
            _ => true,
        }
    }

    /// Logical ids this token depends on
    pub fn referenced_ids(&self) -> Vec<&str> {
        match self {
            Self::Literal(_) | Self::GetAzs => Vec::new(),
            Self::Ref(id) | Self::GetAtt(id, _) => vec![id.as_str()],
            Self::Join(_, parts) => parts.iter().flat_map(Token::referenced_ids).collect(),
            Self::Select(_, list) => list.referenced_ids(),
        }
    }

    /// Intrinsic function form
    pub fn to_value(&self) -> Value {
        match self {
            Self::Literal(s) => Value::String(s.clone()),
            Self::Ref(id) => json!({ "Ref": id }),
            Self::GetAtt(id, attribute) => json!({ "Fn::GetAtt": [id, attribute] }),
            Self::Join(delimiter, parts) => {
                let parts: Vec<Value> = parts.iter().map(Token::to_value).collect();
                json!({ "Fn::Join": [delimiter, parts] })
            }
            Self::Select(index, list) => json!({ "Fn::Select": [index, list.to_value()] }),
            Self::GetAzs => json!({ "Fn::GetAZs": "" }),
        }
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl From<Token> for Value {
    fn from(token: Token) -> Self {
        token.to_value()
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{}", s),
            Self::Ref(id) => write!(f, "${{{}}}", id),
            Self::GetAtt(id, attribute) => write!(f, "${{{}.{}}}", id, attribute),
            Self::Join(delimiter, parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", delimiter)?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
            Self::Select(index, list) => write!(f, "{}[{}]", list, index),
            Self::GetAzs => write!(f, "${{AZs}}"),
        }
    }
}
