//! User-facing message catalogue.
//!
//! Only the status-to-category mapping is load-bearing; the wording is locale
//! content and may be replaced wholesale.

pub const DEFAULT_ERROR: &str = "a communication error occurred";
pub const DEFAULT_RAW_ERROR: &str = "unknown error";
pub const VALIDATION_ERROR: &str = "failed to communicate with the server";
pub const VALIDATION_RAW_ERROR: &str = "validation failed";

pub const BAD_REQUEST: u16 = 400;
pub const UNAUTHORIZED: u16 = 401;
pub const FORBIDDEN: u16 = 403;
pub const NOT_FOUND: u16 = 404;
pub const INTERNAL_SERVER_ERROR: u16 = 500;

/// Reserved client-only codes rendered by custom flows instead of the generic modal.
pub const SPECIAL_ERROR_1: u16 = 598;
pub const SPECIAL_ERROR_2: u16 = 599;

/// Map an HTTP status (or `None` for "no response") to the user-facing message.
pub fn status_message(status: Option<u16>) -> &'static str {
    match status {
        Some(BAD_REQUEST) => "bad request",
        Some(UNAUTHORIZED) => "authentication required",
        Some(FORBIDDEN) => "forbidden",
        Some(NOT_FOUND) => "not found",
        Some(INTERNAL_SERVER_ERROR) => "internal server error",
        Some(SPECIAL_ERROR_1) => "special error 1 occurred",
        Some(SPECIAL_ERROR_2) => "special error 2 occurred",
        _ => DEFAULT_ERROR,
    }
}
