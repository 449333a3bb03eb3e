use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CODE_SUCCESS: i64 = 200;
pub const CODE_UNAUTHORIZED: i64 = 401;

/// Body convention every endpoint answers with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: String,
}

impl ResponseData {
    pub fn from_body(body: &Value) -> Result<Self, Error> {
        if !body.is_object() {
            return Err(Error::Envelope(format!(
                "expected a JSON object, got {}",
                body
            )));
        }
        Self::deserialize(body).map_err(|err| Error::Envelope(err.to_string()))
    }
}

/// A settled request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Business code 200; carries the envelope's `data`.
    Success(T),
    /// Business code 401; the re-authentication hook ran instead of failing.
    Recovered,
}

impl<T> Outcome<T> {
    pub fn data(self) -> Option<T> {
        match self {
            Outcome::Success(data) => Some(data),
            Outcome::Recovered => None,
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, Outcome::Recovered)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(data) => Outcome::Success(f(data)),
            Outcome::Recovered => Outcome::Recovered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default() {
        let envelope = ResponseData::from_body(&json!({"code": 200})).unwrap();
        assert_eq!(envelope.code, CODE_SUCCESS);
        assert_eq!(envelope.data, Value::Null);
        assert!(envelope.message.is_empty());
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        let result = ResponseData::from_body(&json!([1, 2, 3]));
        assert!(matches!(result, Err(Error::Envelope(_))));
    }

    #[test]
    fn test_outcome_map_and_data() {
        let outcome = Outcome::Success(2).map(|n| n * 2);
        assert_eq!(outcome.data(), Some(4));
        assert!(Outcome::<u32>::Recovered.is_recovered());
        assert_eq!(Outcome::<u32>::Recovered.data(), None);
    }
}
