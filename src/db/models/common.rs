//! Response envelope shared by every data operation.

use serde::{Deserialize, Serialize};

/// Uniform `{success, data, message?}` envelope.
///
/// `data` is always present on the wire (`null` on failure); `message` only
/// when there is something to say.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Collapse the envelope into its payload, or the failure message.
    pub fn into_data(self) -> Result<T, String> {
        if !self.success {
            return Err(self.message.unwrap_or_else(|| "Request failed".to_string()));
        }
        self.data
            .ok_or_else(|| "Response carried no data".to_string())
    }

    /// Like `into_data` for operations whose payload is irrelevant.
    pub fn into_unit(self) -> Result<Option<String>, String> {
        if self.success {
            Ok(self.message)
        } else {
            Err(self.message.unwrap_or_else(|| "Request failed".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_serializes_null_data() {
        let response: ApiResponse<u32> = ApiResponse::failure("Invalid email or password");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
        assert_eq!(json["message"], "Invalid email or password");
    }

    #[test]
    fn test_success_omits_message() {
        let json = serde_json::to_value(ApiResponse::ok(7u32)).unwrap();
        assert_eq!(json["data"], 7);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_deserialize_without_data_field() {
        let response: ApiResponse<u32> =
            serde_json::from_str(r#"{"success":false,"message":"nope","code":"unauthorized"}"#)
                .unwrap();
        assert!(!response.success);
        assert_eq!(response.into_data().unwrap_err(), "nope");
    }

    #[test]
    fn test_into_unit_on_null_data() {
        let response: ApiResponse<()> =
            serde_json::from_str(r#"{"success":true,"data":null,"message":"done"}"#).unwrap();
        assert_eq!(response.into_unit().unwrap().as_deref(), Some("done"));
    }
}
