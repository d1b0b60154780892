/// Identifier used when neither the body nor the header names a session.
pub const DEFAULT_SESSION_ID: &str = "default";

pub const SESSION_HEADER: &str = "x-session-id";

/// Picks the session for a request: the body field, then the transport
/// header, then [`DEFAULT_SESSION_ID`]. Blank values are skipped and the
/// winner is trimmed.
pub fn resolve_session_id(body: Option<&str>, header: Option<&str>) -> String {
    [body, header]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|id| !id.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string()
}
