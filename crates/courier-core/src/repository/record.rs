//! Delivery <-> document. `id` lives in the key, not the body.

use serde_json::Value;
use ulid::Ulid;

use crate::domain::Delivery;
use crate::ports::StoreError;

const ID_FIELD: &str = "id";

pub(crate) fn encode(delivery: &Delivery) -> Result<Value, StoreError> {
    let mut value =
        serde_json::to_value(delivery).map_err(|err| StoreError::Codec(err.to_string()))?;
    match &mut value {
        Value::Object(fields) => {
            fields.remove(ID_FIELD);
            Ok(value)
        }
        _ => Err(StoreError::Codec(
            "delivery did not serialize to an object".to_string(),
        )),
    }
}

pub(crate) fn decode(key: Ulid, data: &Value) -> Result<Delivery, StoreError> {
    let mut value = data.clone();
    let Value::Object(fields) = &mut value else {
        return Err(StoreError::Codec(format!("document {key} is not an object")));
    };
    fields.insert(ID_FIELD.to_string(), Value::String(key.to_string()));
    serde_json::from_value(value)
        .map_err(|err| StoreError::Codec(format!("document {key}: {err}")))
}
