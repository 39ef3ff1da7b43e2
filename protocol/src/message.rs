//! The `input_event`/`output_event` wire envelopes exchanged between the
//! supervisor and the guest agent over the local HTTP endpoint.

use serde::{Deserialize, Serialize};
use w3f_types::{ContextData, StorageDelta};

/// A supervisor -> guest message. Only one action exists today, but it is
/// still tagged so a second kind can be added without breaking the wire
/// shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "snake_case")]
pub enum InputEvent {
    Start(StartData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartData {
    pub context: ContextData,
}

/// The guest's error payload: `{name, message}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestError {
    pub name: String,
    pub message: String,
}

impl GuestError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// A guest -> supervisor message: either a successful `result` or a thrown
/// `error`, both carrying the storage delta computed at guest exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "snake_case")]
pub enum OutputEvent {
    Result(ResultData),
    Error(ErrorData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultData {
    pub result: serde_json::Value,
    pub storage: StorageDelta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub error: GuestError,
    pub storage: StorageDelta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_event_serializes_with_action_and_data() {
        let event = InputEvent::Start(StartData {
            context: ContextData {
                gelato_args: w3f_types::GelatoArgs {
                    chain_id: 1,
                    gas_price: w3f_types::GasPrice::zero(),
                    task_id: "t".to_string(),
                    block_time: None,
                },
                user_args: Default::default(),
                secrets: Default::default(),
                storage: Default::default(),
                rpc_provider_url: "http://127.0.0.1:1".to_string(),
                log: None,
            },
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], serde_json::json!("start"));
        assert!(json["data"]["context"].is_object());
    }

    #[test]
    fn output_event_round_trips_error_variant() {
        let event = OutputEvent::Error(ErrorData {
            error: GuestError::new("TypeError", "boom"),
            storage: StorageDelta {
                state: w3f_types::StorageState::Last,
                storage: Default::default(),
                diff: Default::default(),
            },
        });
        let json = serde_json::to_string(&event).unwrap();
        let decoded: OutputEvent = serde_json::from_str(&json).unwrap();
        match decoded {
            OutputEvent::Error(data) => assert_eq!(data.error.name, "TypeError"),
            OutputEvent::Result(_) => panic!("expected error variant"),
        }
    }
}
