/// Longest accepted authority: a 255-byte hostname, a colon, and a port.
pub const MAX_AUTHORITY: usize = 262;

/// Where an absolute-form request URI points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: String,
    pub path: String,
}

/// Splits an absolute `http://host[:port]/path` URI into its target.
///
/// The scheme check is case-insensitive. The authority runs up to the first
/// `/`; without one the path defaults to `/`. An authority longer than
/// [`MAX_AUTHORITY`] is rejected outright rather than truncated. The port
/// defaults to `80`.
pub fn parse_uri(uri: &str) -> Option<Target> {
    let bytes = uri.as_bytes();
    if bytes.len() < 7 || !bytes[..7].eq_ignore_ascii_case(b"http://") {
        return None;
    }
    let rest = &uri[7..];

    let (authority, path) = match rest.find('/') {
        Some(pos) => (&rest[..pos], &rest[pos..]),
        None => (rest, "/"),
    };
    if authority.len() > MAX_AUTHORITY {
        return None;
    }

    let (host, port) = match authority.find(':') {
        Some(pos) => (&authority[..pos], &authority[pos + 1..]),
        None => (authority, "80"),
    };

    Some(Target {
        host: host.to_owned(),
        port: port.to_owned(),
        path: path.to_owned(),
    })
}

/// Splits a CONNECT target (`host[:port]`) on its first colon. The port
/// defaults to `443`.
pub fn split_connect_target(target: &str) -> (String, String) {
    match target.split_once(':') {
        Some((host, port)) => (host.to_owned(), port.to_owned()),
        None => (target.to_owned(), "443".to_owned()),
    }
}
