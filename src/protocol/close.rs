/// Normal closure; the only code that does not trigger a reconnect
pub const NORMAL_CLOSURE: u16 = 1000;

/// Connection dropped without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Client closed the socket after a missed pong
pub const HEARTBEAT_TIMEOUT: u16 = 4000;

/// Client closed the socket after a transport error
pub const TRANSPORT_FAILURE: u16 = 4001;

/// Client gave up waiting for the socket to open
pub const CONNECT_TIMEOUT: u16 = 4002;

/// Human-readable reason for a close code (diagnostics only)
pub fn close_reason(code: u16) -> &'static str {
    match code {
        1000 => "normal closure",
        1001 => "going away",
        1002 => "protocol error",
        1003 => "unsupported data",
        1005 => "no status received",
        1006 => "abnormal closure",
        1007 => "invalid frame payload data",
        1008 => "policy violation",
        1009 => "message too big",
        1010 => "mandatory extension missing",
        1011 => "internal server error",
        1012 => "service restart",
        1013 => "try again later",
        1014 => "bad gateway",
        1015 => "TLS handshake failure",
        HEARTBEAT_TIMEOUT => "heartbeat timeout",
        TRANSPORT_FAILURE => "transport failure",
        CONNECT_TIMEOUT => "connection timeout",
        3000..=3999 => "registered close code",
        4000..=4999 => "application close code",
        _ => "unknown close code",
    }
}

/// Whether a close with this code should start the reconnect logic
pub fn should_reconnect(code: u16) -> bool {
    code != NORMAL_CLOSURE
}
