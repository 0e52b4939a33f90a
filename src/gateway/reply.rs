use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Every endpoint answers either with its payload or with an `error` member.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayReply<T> {
    Declared(String),
    Success(T),
}

impl<T: DeserializeOwned> GatewayReply<T> {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
            return Ok(Self::Declared(describe_error(error)));
        }
        serde_json::from_value(value).map(Self::Success)
    }
}

/// `error.message` when it is a string, the bare string for `"error": "..."`,
/// otherwise the serialized error object.
pub fn describe_error(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => match other.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => other.to_string(),
        },
    }
}

/// Cost and balance fields that ride along on paid responses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Money {
    #[serde(default, deserialize_with = "lenient_number")]
    pub cost: Option<f64>,
    #[serde(
        default,
        rename = "remainingBalance",
        alias = "remaining_balance",
        deserialize_with = "lenient_number"
    )]
    pub remaining_balance: Option<f64>,
}

impl Money {
    /// `Cost: $X.XXXX | Balance: $Y.YYYY`, skipping whichever part is absent.
    pub fn footer(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(cost) = self.cost {
            parts.push(format!("Cost: ${:.4}", cost));
        }
        if let Some(balance) = self.remaining_balance {
            parts.push(format!("Balance: ${:.4}", balance));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" | "))
        }
    }
}

/// Accepts numbers and numeric strings; anything else reads as absent.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_of))
}

/// Optional field of any shape: a value that does not fit `T` reads as absent
/// instead of failing the whole response.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

pub fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Strings render bare, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JavaScript-style truthiness, used for capability flags.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
