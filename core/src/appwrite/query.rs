use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// One entry of the `queries[]` parameter, sent as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attribute: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    values: Vec<Value>,
}

impl Query {
    pub fn equal(attribute: &str, value: impl Into<Value>) -> Self {
        Self {
            method: "equal",
            attribute: Some(attribute.to_string()),
            values: vec![value.into()],
        }
    }

    #[must_use]
    pub fn order_desc(attribute: &str) -> Self {
        Self {
            method: "orderDesc",
            attribute: Some(attribute.to_string()),
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn limit(n: u32) -> Self {
        Self {
            method: "limit",
            attribute: None,
            values: vec![n.into()],
        }
    }

    #[must_use]
    pub fn cursor_after(document_id: &str) -> Self {
        Self {
            method: "cursorAfter",
            attribute: None,
            values: vec![document_id.into()],
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
