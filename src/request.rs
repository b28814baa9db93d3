use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{MAX_HEADERS, MAX_LINE};

/// One parsed client request head. Header lines keep their raw bytes and
/// trailing CRLF so the relay can forward them verbatim.
#[derive(Debug)]
pub struct ParsedRequest {
    pub method: String,
    pub uri: String,
    pub version: String,
    pub headers: Vec<Vec<u8>>,
}

/// Widest accepted method or version token.
const SHORT_TOKEN: usize = 16;

fn malformed(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("malformed {what}"))
}

/// Reads one line (through `\n`) into `buf`, never letting it grow past
/// [`MAX_LINE`]. Returns the number of bytes read; 0 means EOF.
async fn read_line_bounded<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(buf.len());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                buf.extend_from_slice(&available[..=pos]);
                reader.consume(pos + 1);
                if buf.len() > MAX_LINE {
                    return Err(malformed("line (too long)"));
                }
                return Ok(buf.len());
            }
            None => {
                let n = available.len();
                buf.extend_from_slice(available);
                reader.consume(n);
                if buf.len() > MAX_LINE {
                    return Err(malformed("line (too long)"));
                }
            }
        }
    }
}

/// Reads a request line and its headers from the client.
///
/// `Ok(None)` means the client went away before a complete request head was
/// on the wire; the session ends silently. A request line that does not
/// split into three bounded tokens is `InvalidData`, which the caller turns
/// into a `400`. Header lines are collected raw until the empty `\r\n`
/// terminator; lines past [`MAX_HEADERS`] are read then dropped so the
/// stream stays correctly framed.
pub async fn read_request<R>(reader: &mut R) -> io::Result<Option<ParsedRequest>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::with_capacity(128);

    if read_line_bounded(reader, &mut line).await? == 0 {
        return Ok(None);
    }

    let request_line = std::str::from_utf8(&line).map_err(|_| malformed("request line"))?;
    let mut fields = request_line.split_whitespace();
    let (method, uri, version) = match (fields.next(), fields.next(), fields.next()) {
        (Some(m), Some(u), Some(v)) => (m, u, v),
        _ => return Err(malformed("request line")),
    };
    if fields.next().is_some() || method.len() > SHORT_TOKEN || version.len() > SHORT_TOKEN {
        return Err(malformed("request line"));
    }
    let (method, uri, version) = (method.to_owned(), uri.to_owned(), version.to_owned());

    let mut headers = Vec::new();
    loop {
        let n = read_line_bounded(reader, &mut line).await?;
        if n == 0 {
            // EOF mid-headers: no response is owed.
            return Ok(None);
        }
        if line == b"\r\n" || line == b"\n" {
            break;
        }
        if headers.len() < MAX_HEADERS {
            headers.push(line.clone());
        }
    }

    Ok(Some(ParsedRequest {
        method,
        uri,
        version,
        headers,
    }))
}
