//! JSON Schema checks for API responses

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

/// Compile `tests/schemas/<name>.json`
pub fn load_test_schema(name: &str) -> JSONSchema {
    let path = format!("{}/tests/schemas/{}.json", env!("CARGO_MANIFEST_DIR"), name);
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to read schema file: {}", path));
    let schema: Value = serde_json::from_str(&raw)
        .unwrap_or_else(|_| panic!("Failed to parse schema JSON: {}", path));

    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema)
        .expect("Failed to compile schema")
}

/// Collect validation failures as readable strings
pub fn validate_against_schema(data: &Value, schema: &JSONSchema) -> Result<(), Vec<String>> {
    schema.validate(data).map_err(|errors| {
        errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect()
    })
}

/// Panic with the offending body if `data` does not match schema `name`
pub fn assert_matches_schema(name: &str, data: &Value) {
    let schema = load_test_schema(name);
    if let Err(errors) = validate_against_schema(data, &schema) {
        panic!(
            "{} schema validation failed:\n  - {}\nActual response:\n{}",
            name,
            errors.join("\n  - "),
            serde_json::to_string_pretty(data).unwrap()
        );
    }
}
