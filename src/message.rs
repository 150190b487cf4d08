//! Line protocol definitions
//!
//! The wire format is plain newline-delimited UTF-8. The first line of a
//! connection is the username; every later line is chat content that the
//! sending client has already prefixed with its name. Server notices are
//! ordinary lines as well.

/// Sent to a client whose first line was blank or missing
pub const EMPTY_USERNAME_REJECTION: &str = "Username cannot be empty. Closing connection.";

/// Notice broadcast to the other participants when a session registers
pub fn join_notice(username: &str) -> String {
    format!("{} has joined the chat", username)
}

/// Notice broadcast to the remaining participants when a session leaves
pub fn leave_notice(username: &str) -> String {
    format!("{} has left the chat", username)
}

/// Format an outbound chat line the way clients send it
pub fn chat_line(username: &str, text: &str) -> String {
    format!("{}: {}", username, text)
}

/// Whether a line carries no content
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}
