use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes an optional field without failing the surrounding document.
///
/// The value is first read as an untyped [`serde_json::Value`] and then converted into `T`.
/// A missing key, an explicit `null` or a value of the wrong shape all decode to `None`, so a
/// single renamed or retyped field in a runtime response never poisons the sibling fields.
///
/// Intended for use with `#[serde(default, deserialize_with = "jsonutil::lenient")]`.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

/// A field that keeps an absent key apart from a value that does not decode as `T`.
///
/// Use with `#[serde(default)]`: a missing key becomes [`Field::Absent`], anything else that is
/// not a valid `T` (including `null`) is kept verbatim in [`Field::Invalid`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Field<T> {
    #[default]
    Absent,
    Valid(T),
    Invalid(Value),
}

impl<T> Field<T> {
    /// Returns the decoded value, `None` if the key was absent, or the raw value that did not
    /// decode.
    pub fn get(&self) -> Result<Option<&T>, &Value> {
        match self {
            Field::Absent => Ok(None),
            Field::Valid(value) => Ok(Some(value)),
            Field::Invalid(raw) => Err(raw),
        }
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Field::Valid(value)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Field<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(match T::deserialize(&raw) {
            Ok(value) => Field::Valid(value),
            Err(_) => Field::Invalid(raw),
        })
    }
}
