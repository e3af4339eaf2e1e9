use crate::errors::{ClientError, ClientResult};

use std::net::TcpStream;

/// Resolve and connect to the server, returning a non-blocking stream.
///
/// Name resolution and the connect itself block; everything after runs
/// under the event loop, so the socket comes back with non-blocking mode
/// already set.
pub fn dial(host: &str, port: u16) -> ClientResult<TcpStream> {
    let stream = TcpStream::connect((host, port)).map_err(ClientError::Connect)?;
    stream.set_nonblocking(true)?;
    Ok(stream)
}
