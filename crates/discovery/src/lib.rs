//! Transport adapter and NAT-classification state machine for the RFC 3489
//! discovery procedure.

pub mod discovery;
pub mod transport;

pub use discovery::{Client, NatType, Report, TraceEvent};

#[derive(Debug)]
pub enum Error {
    Socket(std::io::Error),
    Codec(codec::Error),
    NoIpv4Address,
    MissingMappedAddress,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Socket(e) => write!(f, "socket error: {e}"),
            Self::Codec(e) => write!(f, "protocol error: {e}"),
            Self::NoIpv4Address => write!(f, "host has no IPv4 address"),
            Self::MissingMappedAddress => write!(f, "response did not carry a MAPPED-ADDRESS"),
        }
    }
}

impl From<codec::Error> for Error {
    fn from(value: codec::Error) -> Self {
        Self::Codec(value)
    }
}
