//! Message protocol between the application context and the cache worker.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use super::types::Request;

/// Path prefix of the synthetic requests keying offline data.
const OFFLINE_DATA_PREFIX: &str = "offline-data";

/// Messages the worker understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
  /// Persist `data` under `key` in the offline-data cache
  SaveData {
    key: String,
    #[serde(default)]
    data: Value,
  },
  /// Read back the data saved under `key`
  GetData { key: String },
}

impl WorkerMessage {
  /// Interpret an incoming message. Unknown shapes yield `None` and are
  /// ignored by the worker.
  pub fn parse(value: &Value) -> Option<Self> {
    serde_json::from_value(value.clone()).ok()
  }
}

/// Reply posted back through the message's reply port.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
  /// Answer to `SAVE_DATA`
  Ack { success: bool },
  /// Answer to `GET_DATA`; `None` when nothing is stored
  Data(Option<Value>),
}

impl Reply {
  pub fn into_value(self) -> Value {
    match self {
      Reply::Ack { success } => json!({ "success": success }),
      Reply::Data(data) => data.unwrap_or(Value::Null),
    }
  }
}

/// The synthetic request under which offline data for `key` is cached:
/// `<origin>/offline-data/<key>`, with `key` as a single escaped segment.
pub fn offline_data_request(origin: &Url, key: &str) -> Result<Request> {
  let mut url = origin.clone();
  url.set_query(None);
  url.set_fragment(None);
  url
    .path_segments_mut()
    .map_err(|_| eyre!("Origin {} cannot hold offline data paths", origin))?
    .clear()
    .push(OFFLINE_DATA_PREFIX)
    .push(key);

  Ok(Request::get(url))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_save_and_get() {
    assert_eq!(
      WorkerMessage::parse(&json!({"type": "SAVE_DATA", "key": "biens", "data": [1, 2]})),
      Some(WorkerMessage::SaveData {
        key: "biens".to_string(),
        data: json!([1, 2]),
      })
    );
    assert_eq!(
      WorkerMessage::parse(&json!({"type": "GET_DATA", "key": "biens"})),
      Some(WorkerMessage::GetData {
        key: "biens".to_string()
      })
    );
  }

  #[test]
  fn test_unknown_messages_are_ignored() {
    assert_eq!(WorkerMessage::parse(&json!({"type": "PING"})), None);
    assert_eq!(WorkerMessage::parse(&json!("SAVE_DATA")), None);
    assert_eq!(WorkerMessage::parse(&json!({"type": "GET_DATA"})), None);
  }

  #[test]
  fn test_message_wire_shape() {
    let message = WorkerMessage::GetData {
      key: "k".to_string(),
    };
    assert_eq!(
      serde_json::to_value(&message).unwrap(),
      json!({"type": "GET_DATA", "key": "k"})
    );
  }

  #[test]
  fn test_reply_values() {
    assert_eq!(Reply::Ack { success: true }.into_value(), json!({"success": true}));
    assert_eq!(Reply::Data(None).into_value(), Value::Null);
    assert_eq!(Reply::Data(Some(json!([1]))).into_value(), json!([1]));
  }

  #[test]
  fn test_offline_data_request_uses_origin_root() {
    let origin = Url::parse("https://smartloc.test/app/index.html?x=1").unwrap();

    let request = offline_data_request(&origin, "paiements").unwrap();
    assert_eq!(request.url.as_str(), "https://smartloc.test/offline-data/paiements");

    let escaped = offline_data_request(&origin, "a/../b c").unwrap();
    assert_eq!(escaped.url.as_str(), "https://smartloc.test/offline-data/a%2F..%2Fb%20c");
  }
}
