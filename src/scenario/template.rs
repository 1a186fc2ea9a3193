//! Captured values and `${name}` templates

use std::collections::BTreeMap;

use serde_json::Value;

/// Values captured from earlier steps of the current run
#[derive(Debug, Default, Clone)]
pub struct Captures {
    values: BTreeMap<String, Value>,
}

impl Captures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }
}

/// Names referenced as `${name}` in a string, in order of appearance
pub fn variables(s: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                names.push(after[..end].trim().to_string());
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

/// Names referenced anywhere inside a JSON value
pub fn json_variables(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => variables(s),
        Value::Array(items) => items.iter().flat_map(json_variables).collect(),
        Value::Object(map) => map.values().flat_map(json_variables).collect(),
        _ => Vec::new(),
    }
}

/// Substitute `${name}` references; `Err` carries the first missing name
pub fn render(s: &str, captures: &Captures) -> Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = after[..end].trim();
        let value = captures.get(name).ok_or_else(|| name.to_string())?;
        match value {
            Value::String(text) => out.push_str(text),
            other => out.push_str(&other.to_string()),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Substitute inside a JSON value
///
/// A string that is exactly `${name}` becomes the captured value itself,
/// so numeric ids stay numeric.
pub fn render_json(value: &Value, captures: &Captures) -> Result<Value, String> {
    Ok(match value {
        Value::String(s) => match whole_reference(s) {
            Some(name) => captures.get(name).cloned().ok_or_else(|| name.to_string())?,
            None => Value::String(render(s, captures)?),
        },
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render_json(item, captures))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), render_json(v, captures)?)))
                .collect::<Result<_, String>>()?,
        ),
        other => other.clone(),
    })
}

fn whole_reference(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    if inner.contains('}') || inner.contains("${") {
        None
    } else {
        Some(inner.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn captures() -> Captures {
        let mut captures = Captures::new();
        captures.insert("pet_id", json!(10001));
        captures.insert("user", json!("testuser_mocha"));
        captures
    }

    #[test]
    fn test_variables() {
        assert_eq!(
            variables("/user/login?username=${user}&x=${ pet_id }"),
            vec!["user".to_string(), "pet_id".to_string()]
        );
        assert!(variables("/pet/findByStatus").is_empty());
        assert!(variables("${unterminated").is_empty());
    }

    #[test]
    fn test_render_strings() {
        let c = captures();
        assert_eq!(render("/pet/${pet_id}", &c).unwrap(), "/pet/10001");
        assert_eq!(render("/user/${user}", &c).unwrap(), "/user/testuser_mocha");
        assert_eq!(render("/order/${order_id}", &c).unwrap_err(), "order_id");
    }

    #[test]
    fn test_render_json_keeps_types() {
        let c = captures();
        let body = json!({
            "id": "${pet_id}",
            "name": "pet-${pet_id}",
            "tags": [{"name": "${user}"}],
            "quantity": 1,
        });
        let rendered = render_json(&body, &c).unwrap();
        assert_eq!(rendered["id"], json!(10001));
        assert_eq!(rendered["name"], json!("pet-10001"));
        assert_eq!(rendered["tags"][0]["name"], json!("testuser_mocha"));
        assert_eq!(rendered["quantity"], json!(1));

        assert_eq!(
            json_variables(&body),
            vec!["pet_id".to_string(), "pet_id".to_string(), "user".to_string()]
        );
    }
}
