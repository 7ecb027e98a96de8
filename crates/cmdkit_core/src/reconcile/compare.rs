//! Structural comparison of local and remote command metadata
//!
//! Both sides are reduced to the fields the platform actually stores, with
//! platform defaults filled in, so that a definition omitting `required =
//! false` matches a remote record that spells it out. Object key order and
//! option order are not significant.

use serde_json::{Map, Value};

/// Command types: 1 chat input, 2 user, 3 message
const CHAT_INPUT: u64 = 1;

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn string_or(value: Option<&Value>, default: &str) -> Value {
    match non_null(value) {
        Some(Value::String(s)) => Value::String(s.clone()),
        Some(other) => other.clone(),
        None => Value::String(default.to_string()),
    }
}

fn bool_or(value: Option<&Value>, default: bool) -> Value {
    Value::Bool(non_null(value).and_then(Value::as_bool).unwrap_or(default))
}

fn number_or(value: Option<&Value>, default: u64) -> Value {
    non_null(value)
        .cloned()
        .unwrap_or_else(|| Value::from(default))
}

/// Localization maps: missing and `null` both mean empty
fn localizations(value: Option<&Value>) -> Value {
    match non_null(value) {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        _ => Value::Object(Map::new()),
    }
}

/// Permission bitsets may be given as numbers or strings
fn permissions(value: Option<&Value>) -> Value {
    match non_null(value) {
        Some(Value::Number(n)) => Value::String(n.to_string()),
        Some(Value::String(s)) => Value::String(s.clone()),
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

fn optional(value: Option<&Value>) -> Value {
    non_null(value).cloned().unwrap_or(Value::Null)
}

fn choices(value: Option<&Value>) -> Value {
    let Some(Value::Array(items)) = non_null(value) else {
        return Value::Array(Vec::new());
    };

    Value::Array(
        items
            .iter()
            .map(|choice| {
                let mut out = Map::new();
                out.insert("name".into(), optional(choice.get("name")));
                out.insert("value".into(), optional(choice.get("value")));
                out.insert(
                    "name_localizations".into(),
                    localizations(choice.get("name_localizations")),
                );
                Value::Object(out)
            })
            .collect(),
    )
}

fn channel_types(value: Option<&Value>) -> Value {
    let Some(Value::Array(items)) = non_null(value) else {
        return Value::Array(Vec::new());
    };
    let mut types: Vec<u64> = items.iter().filter_map(Value::as_u64).collect();
    types.sort_unstable();
    Value::Array(types.into_iter().map(Value::from).collect())
}

fn normalize_options(value: Option<&Value>) -> Value {
    let Some(Value::Array(items)) = non_null(value) else {
        return Value::Array(Vec::new());
    };

    // Option order is what users see, so it is compared as-is
    Value::Array(items.iter().map(normalize_option).collect())
}

fn normalize_option(option: &Value) -> Value {
    let mut out = Map::new();
    out.insert("type".into(), optional(option.get("type")));
    out.insert("name".into(), optional(option.get("name")));
    out.insert("description".into(), string_or(option.get("description"), ""));
    out.insert("required".into(), bool_or(option.get("required"), false));
    out.insert("autocomplete".into(), bool_or(option.get("autocomplete"), false));
    out.insert("choices".into(), choices(option.get("choices")));
    out.insert("options".into(), normalize_options(option.get("options")));
    out.insert("channel_types".into(), channel_types(option.get("channel_types")));
    for bound in ["min_value", "max_value", "min_length", "max_length"] {
        out.insert(bound.into(), optional(option.get(bound)));
    }
    out.insert(
        "name_localizations".into(),
        localizations(option.get("name_localizations")),
    );
    out.insert(
        "description_localizations".into(),
        localizations(option.get("description_localizations")),
    );
    Value::Object(out)
}

/// Reduce command metadata to its comparable form
pub fn normalize(metadata: &Value) -> Value {
    let mut out = Map::new();
    let kind = number_or(metadata.get("type"), CHAT_INPUT);

    out.insert("name".into(), optional(metadata.get("name")));
    // Context-menu commands carry no description on the platform side
    let description = if kind.as_u64() == Some(CHAT_INPUT) {
        string_or(metadata.get("description"), "")
    } else {
        Value::String(String::new())
    };
    out.insert("type".into(), kind);
    out.insert("description".into(), description);
    out.insert("options".into(), normalize_options(metadata.get("options")));
    out.insert(
        "default_member_permissions".into(),
        permissions(metadata.get("default_member_permissions")),
    );
    out.insert("dm_permission".into(), bool_or(metadata.get("dm_permission"), true));
    out.insert("nsfw".into(), bool_or(metadata.get("nsfw"), false));
    out.insert(
        "name_localizations".into(),
        localizations(metadata.get("name_localizations")),
    );
    out.insert(
        "description_localizations".into(),
        localizations(metadata.get("description_localizations")),
    );
    Value::Object(out)
}

/// Whether the remote record needs an edit to match the local metadata
pub fn commands_differ(local: &Value, remote: &Value) -> bool {
    normalize(local) != normalize(remote)
}
