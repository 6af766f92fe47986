//! WebSocket close status codes.
//!
//! See RFC 6455 Section 7.4.

// ============================================================================
// Constants
// ============================================================================

/// Normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// No status code was present in the close frame.
pub const NO_STATUS_CODE: u16 = 1005;

/// Connection dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Payload data inconsistent with the message type.
pub const INCONSISTENT_MESSAGE_TYPE: u16 = 1007;

// ============================================================================
// Functions
// ============================================================================

/// Returns the human-readable name of a close status code.
///
/// Unknown codes map to an empty string.
#[must_use]
pub fn status_text(code: u16) -> &'static str {
    match code {
        1000 => "Normal Closure",
        1001 => "Going Away",
        1002 => "Protocol Error",
        1003 => "Not Acceptable",
        1005 => "No Status Code",
        1006 => "Abnormal Closure",
        1007 => "Inconsistent Message Type",
        1008 => "Policy Violation",
        1009 => "Too Large",
        1010 => "No Extension",
        1011 => "Unexpected Condition",
        1015 => "TLS HandShake Failure",
        _ => "",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(status_text(NORMAL_CLOSURE), "Normal Closure");
        assert_eq!(status_text(INCONSISTENT_MESSAGE_TYPE), "Inconsistent Message Type");
        assert_eq!(status_text(ABNORMAL_CLOSURE), "Abnormal Closure");
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(status_text(4000), "");
    }
}
