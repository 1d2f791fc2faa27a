use serde::{Deserialize, Serialize};

/// Entry of the server's layer list. Identity is the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerRef {
    pub name: String,
}

impl LayerRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Attribute field names declared for a layer.
///
/// Informational only: incoming features are not checked against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSchema {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<String>,
}

impl LayerSchema {
    pub fn new<I, S>(name: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LayerRef, LayerSchema};
    use pretty_assertions::assert_eq;

    #[test]
    fn layer_list_ignores_extra_fields() {
        let payload = r#"[{"name":"sites","properties":["id"]},{"name":"faults"}]"#;
        let layers: Vec<LayerRef> = serde_json::from_str(payload).expect("decode");
        assert_eq!(layers, vec![LayerRef::new("sites"), LayerRef::new("faults")]);
    }

    #[test]
    fn schema_keeps_property_order() {
        let payload = r#"{"name":"faults","properties":["id","fnode_","ltype"]}"#;
        let schema: LayerSchema = serde_json::from_str(payload).expect("decode");
        assert_eq!(schema, LayerSchema::new("faults", ["id", "fnode_", "ltype"]));
    }

    #[test]
    fn schema_without_name_is_rejected() {
        assert!(serde_json::from_str::<LayerSchema>(r#"{"properties":[]}"#).is_err());
    }
}
