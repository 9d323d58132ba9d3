//! Rule option validation against a JSON-schema subset.
//!
//! An array schema is positional: item `i` validates option `i` and extra options
//! are rejected. An object schema validates the whole option list as an array.
//! Supported keywords: `type`, `enum`, `const`, `properties`, `additionalProperties`,
//! `required`, `items`, `minItems`, `maxItems`, `uniqueItems`, `oneOf`, `anyOf`,
//! `minimum`, `maximum`.

use serde_json::{Map, Value};

pub fn validate_options(schema: &Value, options: &[Value]) -> Result<(), String> {
    match schema {
        Value::Array(items) => {
            if options.len() > items.len() {
                return Err(format!(
                    "Value {} should NOT have more than {} items.",
                    Value::Array(options.to_vec()),
                    items.len()
                ));
            }
            for (index, (item_schema, value)) in items.iter().zip(options).enumerate() {
                validate(item_schema, value, &format!("[{}]", index))?;
            }
            Ok(())
        }
        Value::Object(_) => validate(schema, &Value::Array(options.to_vec()), ""),
        _ => Ok(()),
    }
}

fn validate(schema: &Value, value: &Value, path: &str) -> Result<(), String> {
    let Value::Object(schema) = schema else {
        return Ok(());
    };

    if let Some(expected) = schema.get("type") {
        check_type(expected, value, path)?;
    }

    if let Some(Value::Array(allowed)) = schema.get("enum") {
        if !allowed.contains(value) {
            return Err(format!(
                "Value {} {}should be equal to one of the allowed values.",
                value,
                at(path)
            ));
        }
    }

    if let Some(constant) = schema.get("const") {
        if constant != value {
            return Err(format!("Value {} {}should be equal to {}.", value, at(path), constant));
        }
    }

    match value {
        Value::Object(object) => validate_object(schema, object, path)?,
        Value::Array(items) => validate_array(schema, items, path)?,
        Value::Number(number) => {
            if let Some(n) = number.as_f64() {
                if let Some(minimum) = schema.get("minimum").and_then(Value::as_f64) {
                    if n < minimum {
                        return Err(format!("Value {} {}should be >= {}.", value, at(path), minimum));
                    }
                }
                if let Some(maximum) = schema.get("maximum").and_then(Value::as_f64) {
                    if n > maximum {
                        return Err(format!("Value {} {}should be <= {}.", value, at(path), maximum));
                    }
                }
            }
        }
        _ => {}
    }

    if let Some(Value::Array(variants)) = schema.get("anyOf") {
        if !variants.iter().any(|variant| validate(variant, value, path).is_ok()) {
            return Err(format!(
                "Value {} {}should match some schema in anyOf.",
                value,
                at(path)
            ));
        }
    }

    if let Some(Value::Array(variants)) = schema.get("oneOf") {
        let passing = variants
            .iter()
            .filter(|variant| validate(variant, value, path).is_ok())
            .count();
        if passing != 1 {
            return Err(format!(
                "Value {} {}should match exactly one schema in oneOf.",
                value,
                at(path)
            ));
        }
    }

    Ok(())
}

fn validate_object(schema: &Map<String, Value>, object: &Map<String, Value>, path: &str) -> Result<(), String> {
    let properties = schema.get("properties").and_then(Value::as_object);

    if let Some(Value::Array(required)) = schema.get("required") {
        for name in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(name) {
                return Err(format!("{}should have required property '{}'.", at(path), name));
            }
        }
    }

    for (key, item) in object {
        let child_path = format!("{}.{}", path, key);
        match properties.and_then(|p| p.get(key)) {
            Some(property_schema) => validate(property_schema, item, &child_path)?,
            None => match schema.get("additionalProperties") {
                Some(Value::Bool(false)) => {
                    return Err(format!(
                        "{}should NOT have additional properties ('{}').",
                        at(path),
                        key
                    ));
                }
                Some(extra @ Value::Object(_)) => validate(extra, item, &child_path)?,
                _ => {}
            },
        }
    }

    Ok(())
}

fn validate_array(schema: &Map<String, Value>, items: &[Value], path: &str) -> Result<(), String> {
    if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
        if (items.len() as u64) < min {
            return Err(format!("{}should NOT have fewer than {} items.", at(path), min));
        }
    }
    if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
        if (items.len() as u64) > max {
            return Err(format!("{}should NOT have more than {} items.", at(path), max));
        }
    }
    if schema.get("uniqueItems").and_then(Value::as_bool) == Some(true) {
        for (index, item) in items.iter().enumerate() {
            if items[..index].contains(item) {
                return Err(format!(
                    "{}should NOT have duplicate items (items ## {} and {} are identical).",
                    at(path),
                    items[..index].iter().position(|other| other == item).unwrap_or(0),
                    index
                ));
            }
        }
    }

    match schema.get("items") {
        Some(Value::Array(positional)) => {
            for (index, (item_schema, item)) in positional.iter().zip(items).enumerate() {
                validate(item_schema, item, &format!("{}[{}]", path, index))?;
            }
            if schema.get("additionalItems") == Some(&Value::Bool(false)) && items.len() > positional.len() {
                return Err(format!(
                    "{}should NOT have more than {} items.",
                    at(path),
                    positional.len()
                ));
            }
        }
        Some(item_schema @ Value::Object(_)) => {
            for (index, item) in items.iter().enumerate() {
                validate(item_schema, item, &format!("{}[{}]", path, index))?;
            }
        }
        _ => {}
    }

    Ok(())
}

fn check_type(expected: &Value, value: &Value, path: &str) -> Result<(), String> {
    let names: Vec<&str> = match expected {
        Value::String(name) => vec![name.as_str()],
        Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
        _ => return Ok(()),
    };
    if names.iter().any(|name| has_type(name, value)) {
        Ok(())
    } else {
        Err(format!("Value {} {}should be {}.", value, at(path), names.join(",")))
    }
}

fn has_type(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|n| n.fract() == 0.0),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => false,
    }
}

fn at(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("at \"{}\" ", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_array_schema_rejects_options() {
        assert!(validate_options(&json!([]), &[]).is_ok());

        let err = validate_options(&json!([]), &[json!("x")]).unwrap_err();
        assert!(err.contains("should NOT have more than 0 items"));
    }

    #[test]
    fn enum_and_object_properties() {
        let schema = json!([
            { "enum": ["always", "smart"] },
            {
                "type": "object",
                "properties": { "null": { "enum": ["always", "never", "ignore"] } },
                "additionalProperties": false
            }
        ]);

        assert!(validate_options(&schema, &[json!("always"), json!({"null": "ignore"})]).is_ok());
        assert!(validate_options(&schema, &[json!("sometimes")]).is_err());
        assert!(validate_options(&schema, &[json!("always"), json!({"null": "maybe"})]).is_err());

        let err = validate_options(&schema, &[json!("always"), json!({"other": 1})]).unwrap_err();
        assert!(err.contains("additional properties"));
    }

    #[test]
    fn array_items_and_uniqueness() {
        let schema = json!([{
            "type": "object",
            "properties": {
                "allow": { "type": "array", "items": { "type": "string" }, "minItems": 1, "uniqueItems": true }
            }
        }]);

        assert!(validate_options(&schema, &[json!({"allow": ["warn"]})]).is_ok());
        assert!(validate_options(&schema, &[json!({"allow": []})]).is_err());
        assert!(validate_options(&schema, &[json!({"allow": [1]})]).is_err());
        assert!(validate_options(&schema, &[json!({"allow": ["a", "a"]})]).is_err());
    }

    #[test]
    fn any_of_and_one_of() {
        let any = json!([{ "anyOf": [{ "type": "string" }, { "type": "integer", "minimum": 0 }] }]);
        assert!(validate_options(&any, &[json!(3)]).is_ok());
        assert!(validate_options(&any, &[json!(-1)]).is_err());

        let one = json!([{ "oneOf": [{ "type": "number" }, { "type": "integer" }] }]);
        assert!(validate_options(&one, &[json!(1.5)]).is_ok());
        assert!(validate_options(&one, &[json!(2)]).is_err());
    }

    #[test]
    fn object_schema_validates_whole_list() {
        let schema = json!({ "type": "array", "maxItems": 1 });

        assert!(validate_options(&schema, &[json!(1)]).is_ok());
        assert!(validate_options(&schema, &[json!(1), json!(2)]).is_err());
    }

    #[test]
    fn required_properties() {
        let schema = json!([{ "type": "object", "required": ["name"] }]);

        let err = validate_options(&schema, &[json!({})]).unwrap_err();
        assert!(err.contains("required property 'name'"));
    }
}
