use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use showroom_core::errors::ServiceError;

pub const PROTOCOL_VERSION: &str = "MCP-V1";

/// The closed action vocabulary. "Unsupported action" is a data-driven
/// branch on this enum, never a missing method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    SearchCars,
    GetBrands,
    GetColors,
    GetEngines,
    GetCarDetails,
    GetFiltersOptions,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Self::SearchCars,
        Self::GetBrands,
        Self::GetColors,
        Self::GetEngines,
        Self::GetCarDetails,
        Self::GetFiltersOptions,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "search_cars" => Some(Self::SearchCars),
            "get_brands" => Some(Self::GetBrands),
            "get_colors" => Some(Self::GetColors),
            "get_engines" => Some(Self::GetEngines),
            "get_car_details" => Some(Self::GetCarDetails),
            "get_filters_options" => Some(Self::GetFiltersOptions),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchCars => "search_cars",
            Self::GetBrands => "get_brands",
            Self::GetColors => "get_colors",
            Self::GetEngines => "get_engines",
            Self::GetCarDetails => "get_car_details",
            Self::GetFiltersOptions => "get_filters_options",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Action::name).collect()
    }
}

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates a correlation id for requests that did not bring one:
/// a UTC timestamp down to microseconds plus a process-wide counter, so
/// ids stay unique even for frames arriving within the same microsecond.
pub fn generate_request_id() -> String {
    let counter = REQUEST_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    format!("req_{}_{:04}", Utc::now().format("%Y%m%d_%H%M%S_%6f"), counter % 10_000)
}

pub fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

#[derive(Clone, Debug, Serialize)]
pub struct ResponseFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub request_id: Option<String>,
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub timestamp: String,
}

impl ResponseFrame {
    pub fn success(request_id: Option<String>, data: Value) -> Self {
        Self {
            frame_type: "mcp_response",
            request_id,
            success: true,
            data,
            error: None,
            error_code: None,
            timestamp: timestamp(),
        }
    }

    pub fn error(request_id: Option<String>, error: &ServiceError) -> Self {
        Self {
            frame_type: "mcp_error",
            request_id,
            success: false,
            data: Value::Object(Default::default()),
            error: Some(error.wire_message()),
            error_code: Some(error.code().to_string()),
            timestamp: timestamp(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct WelcomeFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub message: &'static str,
    pub protocol: &'static str,
    pub available_actions: Vec<&'static str>,
    pub user: String,
    pub room: String,
    pub timestamp: String,
}

impl WelcomeFrame {
    pub fn new(user: String, room: String) -> Self {
        Self {
            frame_type: "mcp_welcome",
            message: "Connected to the MCP car-search protocol",
            protocol: PROTOCOL_VERSION,
            available_actions: Action::names(),
            user,
            room,
            timestamp: timestamp(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EchoFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub original_message: Value,
    pub message_type: String,
    pub user: String,
    pub room: String,
    pub timestamp: String,
}

impl EchoFrame {
    pub fn new(original_message: Value, message_type: String, user: String, room: String) -> Self {
        Self {
            frame_type: "echo",
            original_message,
            message_type,
            user,
            room,
            timestamp: timestamp(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BroadcastFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub message: Value,
    pub user: String,
    pub room: String,
    pub timestamp: String,
}

impl BroadcastFrame {
    pub fn new(message: Value, user: String, room: String) -> Self {
        Self { frame_type: "broadcast", message, user, room, timestamp: timestamp() }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub message: String,
    pub timestamp: String,
}

impl ChatFrame {
    pub fn new(message: String) -> Self {
        Self { frame_type: "chat_response", message, timestamp: timestamp() }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use showroom_core::errors::ServiceError;

    use super::{generate_request_id, Action, ResponseFrame};

    #[test]
    fn the_action_vocabulary_is_closed_and_round_trips() {
        for action in Action::ALL {
            assert_eq!(Action::parse(action.name()), Some(action));
        }
        assert_eq!(Action::parse("drive_car"), None);
        assert_eq!(Action::names().len(), 6);
    }

    #[test]
    fn generated_request_ids_are_unique_under_rapid_fire() {
        let ids: HashSet<String> = (0..500).map(|_| generate_request_id()).collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| id.starts_with("req_")));
    }

    #[test]
    fn error_frames_carry_the_specific_code() {
        let frame = ResponseFrame::error(
            Some("req-1".to_string()),
            &ServiceError::UnsupportedAction("drive_car".to_string()),
        );

        assert_eq!(frame.frame_type, "mcp_error");
        assert!(!frame.success);
        assert_eq!(frame.request_id.as_deref(), Some("req-1"));
        assert_eq!(frame.error_code.as_deref(), Some("UNSUPPORTED_ACTION"));
        assert!(frame.error.as_deref().unwrap_or_default().contains("drive_car"));
    }
}
