use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Types that can be requested as strict OpenAI structured output.
///
/// Strict mode only accepts schemas where every object has
/// `additionalProperties: false`, every property is `required` (optional
/// fields stay nullable through their type), and nothing is referenced
/// through `$ref`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn openai_schema() -> Value {
        let mut root = serde_json::to_value(schema_for!(Self)).unwrap_or_default();
        let definitions = match &mut root {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("definitions").unwrap_or(Value::Null)
            }
            _ => Value::Null,
        };
        normalize(&mut root, &definitions);
        root
    }

    fn output_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn resolve_ref(map: &Map<String, Value>, definitions: &Value) -> Option<Value> {
    let path = map.get("$ref")?.as_str()?;
    let name = path.strip_prefix("#/definitions/")?;
    definitions.get(name).cloned()
}

fn single_all_of(map: &Map<String, Value>) -> Option<Value> {
    match map.get("allOf")?.as_array()?.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}

/// A schema node, as opposed to a `properties` map keyed by field name.
fn is_schema(map: &Map<String, Value>) -> bool {
    matches!(map.get("type"), Some(Value::String(_) | Value::Array(_)))
        || map.get("anyOf").is_some_and(Value::is_array)
}

/// Inline references and tighten object schemas in a single walk.
fn normalize(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(replacement) =
                resolve_ref(map, definitions).or_else(|| single_all_of(map))
            {
                *value = replacement;
                normalize(value, definitions);
                return;
            }

            if is_schema(map) {
                map.remove("default");
                if map.get("type").and_then(Value::as_str) != Some("string") {
                    map.remove("format");
                }
            }

            if map.get("type").and_then(Value::as_str) == Some("object") {
                let required: Vec<Value> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect())
                    .unwrap_or_default();
                map.insert("required".into(), Value::Array(required));
                map.insert("additionalProperties".into(), Value::Bool(false));
            }

            for child in map.values_mut() {
                normalize(child, definitions);
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize(item, definitions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Cta {
        text: String,
        link: Option<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Plan {
        title: String,
        slides: Vec<String>,
        cta_final: Cta,
    }

    #[test]
    fn optional_fields_are_still_required() {
        let schema = Cta::openai_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"text"));
        assert!(required.contains(&"link"));
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
    }

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Numbered {
        #[serde(default)]
        number: u32,
        #[serde(rename = "type", default)]
        kind: Option<String>,
        #[serde(default)]
        cta: Option<Cta>,
    }

    #[test]
    fn defaults_and_integer_formats_are_dropped() {
        let schema = Numbered::openai_schema();
        let props = schema["properties"].as_object().unwrap();
        assert!(props.contains_key("type"));
        assert_eq!(props["number"]["type"], "integer");
        assert!(props["number"].get("format").is_none());
        assert!(props["number"].get("default").is_none());
        assert!(props["cta"].get("default").is_none());

        let variants = props["cta"]["anyOf"].as_array().unwrap();
        assert!(variants.iter().any(|v| v["type"] == "object"
            && v["additionalProperties"] == Value::Bool(false)));
    }

    #[test]
    fn nested_structs_are_inlined() {
        let schema = Plan::openai_schema();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("definitions"));
        assert!(!obj.contains_key("$schema"));

        let cta = &schema["properties"]["cta_final"];
        assert!(cta.get("$ref").is_none());
        assert_eq!(cta["type"], "object");
        assert_eq!(cta["additionalProperties"], Value::Bool(false));
    }
}
