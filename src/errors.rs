use std::fmt;

/// Custom error types for the ICB client
///
/// Errors fall into two exit-code tiers: local problems (bad arguments,
/// missing environment, failure to reach the server or set up the
/// terminal) exit with code 1, while network and protocol failures after
/// the connection is up exit with code 2.
#[derive(Debug)]
pub enum ClientError {
    /// Bad command line or local environment
    Usage(String),

    /// Could not resolve or connect to the server
    Connect(std::io::Error),

    /// Terminal setup or teardown failed
    Terminal(std::io::Error),

    /// Hard read/write failure on one of the main streams
    Stream {
        name: &'static str,
        source: std::io::Error,
    },

    /// The inbound byte stream could not be reassembled
    Codec(icb_protocol::CodecError),

    /// A message type arrived that the current phase does not allow
    UnexpectedMessage(char),

    /// A structured message was missing a required part
    InvalidMessage { msg_type: char, reason: &'static str },

    /// The server speaks a protocol version we do not
    UnsupportedProtocolVersion(String),

    /// Broken internal invariant
    Internal(&'static str),
}

impl ClientError {
    pub fn stream(name: &'static str, source: std::io::Error) -> Self {
        ClientError::Stream { name, source }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::Usage(_)
            | ClientError::Connect(_)
            | ClientError::Terminal(_)
            | ClientError::Internal(_) => 1,
            ClientError::Stream { .. }
            | ClientError::Codec(_)
            | ClientError::UnexpectedMessage(_)
            | ClientError::InvalidMessage { .. }
            | ClientError::UnsupportedProtocolVersion(_) => 2,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Usage(msg) => write!(f, "{}", msg),
            ClientError::Connect(err) => write!(f, "could not connect: {}", err),
            ClientError::Terminal(err) => write!(f, "terminal setup failed: {}", err),
            ClientError::Stream { name, source } => {
                write!(f, "error occurred on {}: {}", name, source)
            }
            ClientError::Codec(err) => write!(f, "{}", err),
            ClientError::UnexpectedMessage(t) => {
                write!(f, "unexpected message of type '{}' received", t)
            }
            ClientError::InvalidMessage { msg_type, reason } => {
                write!(f, "invalid message of type '{}' received: {}", msg_type, reason)
            }
            ClientError::UnsupportedProtocolVersion(v) => {
                write!(f, "unsupported protocol version {:?}", v)
            }
            ClientError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Connect(err)
            | ClientError::Terminal(err)
            | ClientError::Stream { source: err, .. } => Some(err),
            ClientError::Codec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<icb_protocol::CodecError> for ClientError {
    fn from(err: icb_protocol::CodecError) -> Self {
        ClientError::Codec(err)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::ConnectionRefused | ErrorKind::TimedOut => ClientError::Connect(err),
            _ => ClientError::Stream {
                name: "network",
                source: err,
            },
        }
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
