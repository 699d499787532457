//! Wallet pass registration models

use serde::{Deserialize, Serialize};

/// A device registered for update pushes of one pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PassRegistration {
    pub device_library_identifier: String,
    pub push_token: String,
    pub pass_type_identifier: String,
    pub serial_number: String,
    pub created_at: i64,
}

/// Body Wallet sends when registering a device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistrationBody {
    pub push_token: String,
}

/// Response of the "serial numbers for device" endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialNumbersResponse {
    pub serial_numbers: Vec<String>,
    pub last_updated: String,
}

/// Body of the Wallet log endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassLogBody {
    #[serde(default)]
    pub logs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_wire_names() {
        let body: DeviceRegistrationBody =
            serde_json::from_str(r#"{"pushToken":"abc123"}"#).unwrap();
        assert_eq!(body.push_token, "abc123");

        let json = serde_json::to_value(SerialNumbersResponse {
            serial_numbers: vec!["L-1".into()],
            last_updated: "1700000000000".into(),
        })
        .unwrap();
        assert_eq!(json["serialNumbers"][0], "L-1");
        assert_eq!(json["lastUpdated"], "1700000000000");
    }
}
