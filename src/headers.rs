/// What the proxy identifies itself as upstream.
pub const PROXY_USER_AGENT: &str = "Mozilla/5.0 (compatible; Strait/0.1)";

/// Case-insensitive ASCII prefix test on a raw header line.
pub fn header_starts_with(header_line: &[u8], prefix: &[u8]) -> bool {
    if header_line.len() < prefix.len() {
        return false;
    }
    header_line
        .iter()
        .zip(prefix)
        .all(|(h, p)| h.eq_ignore_ascii_case(p))
}

/// Builds the header block forwarded upstream from the client's raw header
/// lines (each still carrying its CRLF).
///
/// `Host:` is forwarded as-is; `Connection:`, `Proxy-Connection:`, and
/// `User-Agent:` are dropped; everything else passes through verbatim. When
/// the client sent no `Host:`, one is synthesized from `hostname`. The block
/// always ends with the three canonical trailers and the empty terminator
/// line.
pub fn rewrite_headers(headers: &[Vec<u8>], hostname: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    let mut host_seen = false;

    for line in headers {
        if header_starts_with(line, b"Host:") {
            host_seen = true;
        } else if header_starts_with(line, b"Connection:")
            || header_starts_with(line, b"Proxy-Connection:")
            || header_starts_with(line, b"User-Agent:")
        {
            continue;
        }
        out.extend_from_slice(line);
    }

    if !host_seen {
        out.extend_from_slice(format!("Host: {hostname}\r\n").as_bytes());
    }
    out.extend_from_slice(b"Connection: close\r\n");
    out.extend_from_slice(b"Proxy-Connection: close\r\n");
    out.extend_from_slice(format!("User-Agent: {PROXY_USER_AGENT}\r\n").as_bytes());
    out.extend_from_slice(b"\r\n");
    out
}
