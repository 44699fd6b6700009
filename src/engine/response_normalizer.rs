use serde_json::Value;

/// Reduce a text-endpoint payload to plain narrative text.
///
/// The services behind the two endpoints do not agree on a response shape, so
/// the known shapes are tried in order and the first one present wins:
/// 1. chat completion: `choices[0].message.content`
/// 2. `output`, either a string or a list of lines
/// 3. a bare JSON string
/// 4. anything else is serialized back to JSON text
///
/// Total over every `Value`: never panics, always returns a string.
pub fn normalize_payload(payload: &Value) -> String {
    if let Some(content) = payload
        .pointer("/choices/0/message/content")
        .filter(|v| is_truthy(v))
    {
        return value_to_text(content);
    }

    if let Some(output) = payload.get("output").filter(|v| is_truthy(v)) {
        return match output {
            Value::Array(lines) => lines
                .iter()
                .map(value_to_text)
                .collect::<Vec<_>>()
                .join("\n"),
            other => value_to_text(other),
        };
    }

    if let Value::String(text) = payload {
        return text.clone();
    }

    log::debug!("unrecognized payload shape, using raw JSON");
    payload.to_string()
}

/// Loose truthiness as the generation services use it: null, false, 0 and "" are empty.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
