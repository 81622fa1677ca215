//! Error types for the smcfan system

use thiserror::Error;

use crate::key::SmcKey;
use crate::smc::ProtocolStep;

/// Core error type for SMC operations
#[derive(Error, Debug)]
pub enum SmcError {
    /// Caller bug: bad index, bad key text, out-of-range payload length.
    /// Always returned before any hardware access.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A status poll reached its ceiling
    #[error("Timed out waiting for SMC status ({step})")]
    Timeout { step: ProtocolStep },

    /// The hardware reported the key does not exist, or discovery found nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// The hardware reported a read-only key during a write
    #[error("Key {0} is write protected")]
    WriteProtected(SmcKey),

    /// Hardware identification failed
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Any other hardware-reported fault or undersized response
    #[error("Device error: {context}{}", format_code(.code))]
    DeviceError { context: String, code: Option<u8> },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn format_code(code: &Option<u8>) -> String {
    match code {
        Some(code) => format!(" (SMC error 0x{:02X})", code),
        None => String::new(),
    }
}

impl SmcError {
    /// Shorthand for a [`SmcError::DeviceError`] without an error code
    pub fn device(context: impl Into<String>) -> Self {
        SmcError::DeviceError {
            context: context.into(),
            code: None,
        }
    }

    /// `true` when the hardware said the addressed key does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, SmcError::NotFound(_))
    }
}

/// Result type alias for SMC operations
pub type Result<T> = std::result::Result<T, SmcError>;

impl From<serde_json::Error> for SmcError {
    fn from(err: serde_json::Error) -> Self {
        SmcError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for SmcError {
    fn from(err: toml::de::Error) -> Self {
        SmcError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let smc_err: SmcError = json_err.into();

        match smc_err {
            SmcError::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no access");
        let smc_err: SmcError = io_err.into();

        match smc_err {
            SmcError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = SmcError::InvalidParameter("fan index 7".to_string());
        assert_eq!(format!("{}", err), "Invalid parameter: fan index 7");

        let err = SmcError::Timeout {
            step: ProtocolStep::CommandSent,
        };
        assert_eq!(
            format!("{}", err),
            "Timed out waiting for SMC status (command sent)"
        );

        let err = SmcError::DeviceError {
            context: "no ack for read F0Ac".to_string(),
            code: Some(0x82),
        };
        assert_eq!(
            format!("{}", err),
            "Device error: no ack for read F0Ac (SMC error 0x82)"
        );

        let err = SmcError::device("short response");
        assert_eq!(format!("{}", err), "Device error: short response");

        let key: SmcKey = "F0Mx".parse().unwrap();
        let err = SmcError::WriteProtected(key);
        assert_eq!(format!("{}", err), "Key F0Mx is write protected");
    }

    #[test]
    fn test_is_not_found() {
        assert!(SmcError::NotFound("key TC0P".to_string()).is_not_found());
        assert!(!SmcError::device("boom").is_not_found());
    }
}
