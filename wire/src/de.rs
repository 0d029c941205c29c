//! Lenient number decoding shared by the wire DTOs.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Optional integer that tolerates integral floats (`1712.0`) and `null`.
pub(crate) fn opt_i64_from_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Ok(Some(int));
            }
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            if let Some(float) = number.as_f64()
                && float.is_finite()
                && float >= i64::MIN as f64
                && float <= i64::MAX as f64
            {
                return Ok(Some(float.round() as i64));
            }
            Err(D::Error::custom("expected integer-compatible number"))
        }
        _ => Err(D::Error::custom("expected number")),
    }
}
