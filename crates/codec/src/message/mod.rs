pub mod attributes;
pub mod message_type;

use std::fmt;

use rand::Rng;

use crate::{
    Error,
    buffer::ByteBuffer,
    message::attributes::{Attribute, AttributeType, Value},
};

pub use message_type::MessageType;

/// RFC 3489 header length: 2 (type) + 2 (length) + 16 (transaction id).
pub const MESSAGE_HEADER_LENGTH: usize = 20;

/// 2 (type) + 2 (length) for every attribute TLV.
pub const ATTRIBUTE_HEADER_LENGTH: usize = 4;

/// A 128-bit opaque value correlating a request with its response.
///
/// Generated once per outgoing request and compared for equality; rendered
/// in a canonical lowercase-hex form for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionId([u8; 16]);

impl TransactionId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<[u8; 16]> for TransactionId {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}

/// A STUN message: a message type, a transaction id, and an ordered list of
/// attributes. Attribute order is wire order; the message exclusively owns
/// its attributes.
#[derive(Debug, Clone)]
pub struct Message {
    message_type: MessageType,
    transaction_id: TransactionId,
    attributes: Vec<Attribute>,
}

impl Message {
    pub fn new(message_type: MessageType, transaction_id: TransactionId) -> Self {
        Self {
            message_type,
            transaction_id,
            attributes: Vec::new(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// First attribute of `kind`, if present.
    pub fn get(&self, kind: AttributeType) -> Option<&Attribute> {
        self.attributes.iter().find(|it| it.kind == kind as u16)
    }

    /// All attributes of `kind`, in wire order.
    pub fn get_all<'a>(&'a self, kind: AttributeType) -> impl Iterator<Item = &'a Attribute> {
        self.attributes.iter().filter(move |it| it.kind == kind as u16)
    }

    /// Encode the 20-byte header followed by every attribute in insertion
    /// order. No 4-byte alignment padding: that is an RFC 5389/8489 rule,
    /// not part of this wire format.
    ///
    /// # Test
    ///
    /// ```
    /// use stun_probe_codec::buffer::ByteBuffer;
    /// use stun_probe_codec::message::{Message, MessageType, TransactionId};
    ///
    /// let mut buf = ByteBuffer::new();
    /// let message = Message::new(MessageType::BindingRequest, TransactionId::from([0u8; 16]));
    /// message.encode(&mut buf).unwrap();
    ///
    /// assert_eq!(buf.readable(), 20);
    /// ```
    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<(), Error> {
        buf.reserve(MESSAGE_HEADER_LENGTH)?;
        buf.write_u16(u16::from(self.message_type).to_be())?;

        // placeholder for the attribute-block length, patched below.
        buf.write_u16(0)?;
        buf.write_bytes(self.transaction_id.as_bytes())?;

        let body_start = buf.readable();
        for attribute in &self.attributes {
            attribute.encode(buf)?;
        }

        let body_len = (buf.readable() - body_start) as u16;
        buf.update_u16(2, body_len.to_be())?;
        Ok(())
    }

    /// Decode a message from the front of `buf`. Requires at least 20 bytes
    /// readable; fails if the declared attribute-block length does not
    /// match what's available, or if attribute decoding does not exactly
    /// consume it (a non-zero remainder is a protocol error, not silently
    /// ignored trailing garbage).
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self, Error> {
        if buf.readable() < MESSAGE_HEADER_LENGTH {
            return Err(Error::ShortBuffer);
        }

        let message_type = MessageType::try_from(u16::from_be(buf.read_u16()?))?;
        let declared_len = u16::from_be(buf.read_u16()?) as usize;

        let mut id = [0u8; 16];
        buf.read_bytes(&mut id)?;
        let transaction_id = TransactionId::from(id);

        if buf.readable() < declared_len {
            return Err(Error::LengthMismatch);
        }

        let mut remaining = declared_len;
        let mut message = Self::new(message_type, transaction_id);

        while remaining > 0 {
            if remaining < ATTRIBUTE_HEADER_LENGTH {
                return Err(Error::LengthMismatch);
            }

            let before = buf.readable();
            let attribute = Attribute::decode(buf)?;
            let consumed = before - buf.readable();

            if consumed > remaining {
                return Err(Error::LengthMismatch);
            }

            remaining -= consumed;
            message.push(attribute);
        }

        Ok(message)
    }
}

/// Convenience constructors for the requests the discovery engine issues;
/// the factory only ever builds responses out of the wire (see
/// [`Message::decode`]), requests are always named explicitly by the
/// caller.
impl Message {
    pub fn binding_request(transaction_id: TransactionId) -> Self {
        Self::new(MessageType::BindingRequest, transaction_id)
    }

    pub fn with_change_request(mut self, change_ip: bool, change_port: bool) -> Self {
        self.push(Attribute {
            kind: AttributeType::ChangeRequest as u16,
            value: Value::ChangeRequest {
                change_ip,
                change_port,
            },
        });

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::attributes::Attribute;
    use std::net::Ipv4Addr;

    #[test]
    fn round_trips_binding_request_with_change_request() {
        let id = TransactionId::generate();
        let message = Message::binding_request(id).with_change_request(true, false);

        let mut buf = ByteBuffer::new();
        message.encode(&mut buf).unwrap();

        let decoded = Message::decode(&mut buf).unwrap();
        assert_eq!(decoded.message_type(), MessageType::BindingRequest);
        assert_eq!(decoded.transaction_id(), id);

        let change_request = decoded.get(AttributeType::ChangeRequest).unwrap();
        assert_eq!(
            change_request.value,
            Value::ChangeRequest {
                change_ip: true,
                change_port: false,
            }
        );
    }

    #[test]
    fn round_trips_binding_response_with_address_attributes() {
        let id = TransactionId::generate();
        let mut message = Message::new(MessageType::BindingResponse, id);

        message.push(Attribute {
            kind: AttributeType::MappedAddress as u16,
            value: Value::Address {
                family: 1,
                port: 40001,
                ipv4: Ipv4Addr::new(203, 0, 113, 5),
            },
        });

        message.push(Attribute {
            kind: AttributeType::ChangedAddress as u16,
            value: Value::Address {
                family: 1,
                port: 3479,
                ipv4: Ipv4Addr::new(198, 51, 100, 2),
            },
        });

        let mut buf = ByteBuffer::new();
        message.encode(&mut buf).unwrap();

        let decoded = Message::decode(&mut buf).unwrap();
        assert_eq!(decoded.message_type(), MessageType::BindingResponse);

        let mapped = decoded.get(AttributeType::MappedAddress).unwrap();
        assert_eq!(
            mapped.value,
            Value::Address {
                family: 1,
                port: 40001,
                ipv4: Ipv4Addr::new(203, 0, 113, 5),
            }
        );
    }

    #[test]
    fn header_length_invariant_holds() {
        let id = TransactionId::generate();
        let message = Message::binding_request(id).with_change_request(true, true);

        let mut buf = ByteBuffer::new();
        message.encode(&mut buf).unwrap();

        let declared = u16::from_be(buf.peek_u16(2).unwrap()) as usize;
        assert_eq!(buf.readable(), MESSAGE_HEADER_LENGTH + declared);
        assert_eq!(declared, ATTRIBUTE_HEADER_LENGTH + 4);
    }

    #[test]
    fn unknown_mandatory_attribute_is_rejected() {
        let id = TransactionId::generate();
        let mut buf = ByteBuffer::new();

        buf.reserve(MESSAGE_HEADER_LENGTH + ATTRIBUTE_HEADER_LENGTH)
            .unwrap();

        buf.write_u16(u16::from(MessageType::BindingResponse).to_be())
            .unwrap();
        buf.write_u16((ATTRIBUTE_HEADER_LENGTH as u16).to_be())
            .unwrap();
        buf.write_bytes(id.as_bytes()).unwrap();

        // 0x0020 is not one of the eleven recognized attribute types and
        // is below 0x8000, so it is mandatory-to-understand.
        buf.write_u16(0x0020u16.to_be()).unwrap();
        buf.write_u16(0u16.to_be()).unwrap();

        assert!(matches!(
            Message::decode(&mut buf),
            Err(Error::UnknownMandatoryAttribute)
        ));
    }
}
