//! The RFC 3489 decision tree: up to four Binding requests across two
//! server endpoints, correlated by transaction id, classifying the path
//! into one of seven NAT categories (or, for one edge case the original
//! implementation treats as fatal, [`NatType::Indeterminate`]).

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use codec::buffer::ByteBuffer;
use codec::message::attributes::{AttributeType, Value};
use codec::message::{Message, MessageType, TransactionId};

use crate::Error;
use crate::transport::{Transport, local_ipv4_addresses, resolve_ipv4};

const RETRY_INTERVAL: Duration = Duration::from_millis(200);
const MAX_DATAGRAM: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatType {
    OpenInternet,
    UdpBlocked,
    SymmetricUdpFirewall,
    FullConeNat,
    RestrictedConeNat,
    PortRestrictedConeNat,
    SymmetricNat,
    /// The CHANGED-ADDRESS retest (Test I to C1) could not reach the
    /// server's alternate endpoint. The original implementation asserts
    /// here; this is a soft outcome instead.
    Indeterminate,
}

/// One completed test, kept for the CLI's printed trace.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    pub test: &'static str,
    pub target: SocketAddr,
    pub outcome: String,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub nat_type: NatType,
    pub trace: Vec<TraceEvent>,
}

/// Drives the discovery procedure on the calling thread. Single-threaded,
/// blocking I/O only; the socket is exclusively owned here for the
/// lifetime of one `discover()` call.
pub struct Client {
    transport: Transport,
    primary: SocketAddr,
    timeout_ms: u64,
    trace: Vec<TraceEvent>,
}

impl Client {
    pub fn new(host: &str, port: u16, timeout_ms: u64) -> Result<Self, Error> {
        let ip = resolve_ipv4(host)?;

        Ok(Self {
            transport: Transport::bind()?,
            primary: SocketAddr::new(ip.into(), port),
            timeout_ms: timeout_ms.max(RETRY_INTERVAL.as_millis() as u64),
            trace: Vec::new(),
        })
    }

    pub fn discover(mut self) -> Result<Report, Error> {
        let local_addrs = local_ipv4_addresses()?;

        let test1 = Message::binding_request(TransactionId::generate());
        let r1 = self.run_test("TestI", self.primary, &test1)?;

        let Some(r1) = r1 else {
            return Ok(self.finish(NatType::UdpBlocked));
        };

        let m1 = mapped_address(&r1)?;
        let c1 = changed_address(&r1);
        let behind_nat = !is_local_address(m1.ip(), &local_addrs);

        let test2 = Message::binding_request(TransactionId::generate()).with_change_request(true, true);
        let r2 = self.run_test("TestII", self.primary, &test2)?;

        if !behind_nat {
            return Ok(self.finish(if r2.is_some() {
                NatType::OpenInternet
            } else {
                NatType::SymmetricUdpFirewall
            }));
        }

        if r2.is_some() {
            return Ok(self.finish(NatType::FullConeNat));
        }

        let Some(c1) = c1 else {
            return Ok(self.finish(NatType::Indeterminate));
        };

        let test1_again = Message::binding_request(TransactionId::generate());
        let r1b = self.run_test("TestI-changed", c1, &test1_again)?;

        let Some(r1b) = r1b else {
            return Ok(self.finish(NatType::Indeterminate));
        };

        let m1b = mapped_address(&r1b)?;
        if m1b != m1 {
            return Ok(self.finish(NatType::SymmetricNat));
        }

        let test3 = Message::binding_request(TransactionId::generate()).with_change_request(false, true);
        let r3 = self.run_test("TestIII", c1, &test3)?;

        Ok(self.finish(if r3.is_some() {
            NatType::RestrictedConeNat
        } else {
            NatType::PortRestrictedConeNat
        }))
    }

    fn finish(self, nat_type: NatType) -> Report {
        Report {
            nat_type,
            trace: self.trace,
        }
    }

    /// Send `request` to `target`, retrying every 200 ms until a
    /// correlated Binding response arrives or the test's attempt budget
    /// (`timeout_ms / 200` total receive attempts) is exhausted.
    /// Uncorrelated datagrams are discarded without spending an attempt; a
    /// protocol parse error, an unrelated message type, or a
    /// BindingErrorResponse counts as "no response" for the current
    /// attempt.
    fn run_test(
        &mut self,
        name: &'static str,
        target: SocketAddr,
        request: &Message,
    ) -> Result<Option<Message>, Error> {
        self.transport.set_remote(target);

        let mut encoded = ByteBuffer::new();
        request.encode(&mut encoded)?;
        let bytes = encoded.read_all();

        let budget = self.timeout_ms / RETRY_INTERVAL.as_millis() as u64;
        let mut attempts = 0u64;
        let mut recv_buf = [0u8; MAX_DATAGRAM];

        self.transport.send(&bytes)?;

        loop {
            match self.transport.recv(&mut recv_buf, RETRY_INTERVAL)? {
                Some(n) => match decode_response(&recv_buf[..n], request.transaction_id()) {
                    Correlated::Response(message) => {
                        self.record(name, target, "response");
                        return Ok(Some(message));
                    }
                    Correlated::Uncorrelated => continue,
                    Correlated::NoUsableResponse => {
                        attempts += 1;
                        if attempts >= budget {
                            self.record(name, target, "no response");
                            return Ok(None);
                        }

                        self.transport.send(&bytes)?;
                    }
                },
                None => {
                    attempts += 1;
                    if attempts >= budget {
                        self.record(name, target, "no response");
                        return Ok(None);
                    }

                    self.transport.send(&bytes)?;
                }
            }
        }
    }

    fn record(&mut self, test: &'static str, target: SocketAddr, outcome: &str) {
        log::info!("{test}: target={target}, outcome={outcome}");
        self.trace.push(TraceEvent {
            test,
            target,
            outcome: outcome.to_string(),
        });
    }
}

enum Correlated {
    Response(Message),
    Uncorrelated,
    NoUsableResponse,
}

fn decode_response(bytes: &[u8], expected: TransactionId) -> Correlated {
    let mut buf = ByteBuffer::new();
    if buf.reserve(bytes.len()).is_err() || buf.write_bytes(bytes).is_err() {
        return Correlated::NoUsableResponse;
    }

    let message = match Message::decode(&mut buf) {
        Ok(message) => message,
        Err(_) => return Correlated::NoUsableResponse,
    };

    if message.transaction_id() != expected {
        return Correlated::Uncorrelated;
    }

    match message.message_type() {
        MessageType::BindingResponse => Correlated::Response(message),
        // A BindingErrorResponse is correlated but not usable: treated the
        // same as no response for classification purposes.
        _ => Correlated::NoUsableResponse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_response_is_a_usable_response() {
        let id = TransactionId::generate();
        let message = Message::new(MessageType::BindingResponse, id);

        let mut buf = ByteBuffer::new();
        message.encode(&mut buf).unwrap();
        let bytes = buf.read_all();

        assert!(matches!(
            decode_response(&bytes, id),
            Correlated::Response(_)
        ));
    }

    #[test]
    fn binding_error_response_is_not_a_usable_response() {
        let id = TransactionId::generate();
        let message = Message::new(MessageType::BindingErrorResponse, id);

        let mut buf = ByteBuffer::new();
        message.encode(&mut buf).unwrap();
        let bytes = buf.read_all();

        assert!(matches!(
            decode_response(&bytes, id),
            Correlated::NoUsableResponse
        ));
    }

    #[test]
    fn uncorrelated_transaction_id_is_discarded() {
        let id = TransactionId::generate();
        let other = TransactionId::generate();
        let message = Message::new(MessageType::BindingResponse, id);

        let mut buf = ByteBuffer::new();
        message.encode(&mut buf).unwrap();
        let bytes = buf.read_all();

        assert!(matches!(
            decode_response(&bytes, other),
            Correlated::Uncorrelated
        ));
    }
}

fn mapped_address(message: &Message) -> Result<SocketAddr, Error> {
    match message.get(AttributeType::MappedAddress) {
        Some(attribute) => match attribute.value {
            Value::Address { port, ipv4, .. } => Ok(SocketAddr::new(ipv4.into(), port)),
            _ => Err(Error::MissingMappedAddress),
        },
        None => Err(Error::MissingMappedAddress),
    }
}

fn changed_address(message: &Message) -> Option<SocketAddr> {
    match message.get(AttributeType::ChangedAddress)?.value {
        Value::Address { port, ipv4, .. } => Some(SocketAddr::new(ipv4.into(), port)),
        _ => None,
    }
}

/// "Local address" membership ignores port, per the spec's address
/// equality rules — only IPv4 match matters here.
fn is_local_address(ip: std::net::IpAddr, local_addrs: &[Ipv4Addr]) -> bool {
    match ip {
        std::net::IpAddr::V4(ip) => local_addrs.contains(&ip),
        std::net::IpAddr::V6(_) => false,
    }
}
