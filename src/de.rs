use serde::de::{Deserialize, Deserializer, Error};

/// Accept only `true`, so that an `ok` field can discriminate untagged
/// response variants.
pub fn only_true<'a, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'a>,
{
    bool::deserialize(deserializer).and_then(|b| {
        if b {
            Ok(b)
        } else {
            Err(Error::custom("invalid bool: false"))
        }
    })
}

pub fn only_false<'a, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'a>,
{
    bool::deserialize(deserializer).and_then(|b| {
        if b {
            Err(Error::custom("invalid bool: true"))
        } else {
            Ok(b)
        }
    })
}

/// Slack isn't consistent about whether it wraps file objects in a list, so
/// accept either form.
///
/// ```json
/// { "files": [{ "id": "F1" }] }
/// ```
///
/// ```json
/// { "files": { "id": "F1" } }
/// ```
pub fn one_or_many<'a, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'a>,
    T: Deserialize<'a>,
{
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(xs) => xs,
        OneOrMany::One(x) => vec![x],
    })
}

/// Read a hand-written scalar as text, so `12345` and `"12345"` are the same
/// value. `null` is absent; lists and objects are rejected.
pub fn loose_string<'a, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'a>,
{
    use serde_json::Value;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(x) => Err(Error::custom(format!("expected a scalar, got {}", x))),
    }
}
