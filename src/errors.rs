use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Writes a formatted HTTP/1.0 error page to the client and flushes it.
pub async fn client_error<W>(
    stream: &mut W,
    cause: &str,
    errnum: u16,
    shortmsg: &str,
    longmsg: &str,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = format!(
        "<html><title>Strait Error</title><body bgcolor=\"ffffff\">\r\n\
         {errnum}: {shortmsg}\r\n\
         <p>{longmsg}: {cause}\r\n\
         <hr><em>The strait web proxy</em>\r\n\
         </body></html>"
    );
    let head = format!(
        "HTTP/1.0 {errnum} {shortmsg}\r\nContent-type: text/html\r\nContent-length: {}\r\n\r\n",
        body.len()
    );

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.flush().await
}
