use lazy_static::lazy_static;
use std::collections::HashMap;

pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error, please try again later.";

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

lazy_static! {
    pub static ref RESPONSE_STATUS_MESSAGES: HashMap<u16, &'static str> = HashMap::from([
        (400, "The server could not understand the request due to invalid syntax."),
        (401, "The request is not authorized."),
        (403, "The server refused to perform this request."),
        (404, "The requested resource does not exist."),
        (405, "The request method is not allowed."),
        (500, "Internal server error, the request could not be completed."),
        (501, "The server does not support the functionality required by this request."),
        (502, "The gateway received an invalid response from the upstream server."),
        (503, "The server is temporarily unavailable due to maintenance or overload."),
        (504, "The gateway did not receive a timely response from the upstream server."),
    ]);
}

/// Human-readable message for a transport status, falling back to the
/// generic message for statuses outside the table.
pub fn status_message(status: u16) -> &'static str {
    RESPONSE_STATUS_MESSAGES
        .get(&status)
        .copied()
        .unwrap_or(UNKNOWN_ERROR_MESSAGE)
}
