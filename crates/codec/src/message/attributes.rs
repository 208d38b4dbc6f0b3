//! Tagged-variant attribute model.
//!
//! The original implementation dispatches on a class hierarchy with virtual
//! value encoders; here a single `Value` enum carries every representation
//! the core understands, and encode/decode are a `match` rather than
//! dynamic dispatch.

use std::net::Ipv4Addr;

use crate::{Error, buffer::ByteBuffer, message::ATTRIBUTE_HEADER_LENGTH};

/// Attribute type codes recognized by the core (RFC 3489 §11.2).
///
/// Types not in this set that are `<= 0x7fff` are mandatory-to-understand
/// and reject the containing message; types `>= 0x8000` are optional and
/// carried opaquely without a named variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum AttributeType {
    MappedAddress = 0x0001,
    ResponseAddress = 0x0002,
    ChangeRequest = 0x0003,
    SourceAddress = 0x0004,
    ChangedAddress = 0x0005,
    UserName = 0x0006,
    Password = 0x0007,
    MessageIntegrity = 0x0008,
    ErrorCode = 0x0009,
    UnknownAttributes = 0x000a,
    ReflectedFrom = 0x000b,
}

impl TryFrom<u16> for AttributeType {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0x0001 => Self::MappedAddress,
            0x0002 => Self::ResponseAddress,
            0x0003 => Self::ChangeRequest,
            0x0004 => Self::SourceAddress,
            0x0005 => Self::ChangedAddress,
            0x0006 => Self::UserName,
            0x0007 => Self::Password,
            0x0008 => Self::MessageIntegrity,
            0x0009 => Self::ErrorCode,
            0x000a => Self::UnknownAttributes,
            0x000b => Self::ReflectedFrom,
            _ => return Err(Error::UnknownAttributeType),
        })
    }
}

impl AttributeType {
    fn is_address(self) -> bool {
        matches!(
            self,
            Self::MappedAddress
                | Self::ResponseAddress
                | Self::SourceAddress
                | Self::ChangedAddress
                | Self::ReflectedFrom
        )
    }
}

/// An attribute's value, tagged by shape rather than by type: the five
/// address-bearing attributes and CHANGE-REQUEST get structured variants,
/// everything else the core recognizes but does not interpret is carried
/// as an opaque blob of its declared length (USERNAME, PASSWORD,
/// MESSAGE-INTEGRITY, ERROR-CODE, UNKNOWN-ATTRIBUTES, and any optional
/// attribute type the core has never heard of).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Address {
        family: u8,
        port: u16,
        ipv4: Ipv4Addr,
    },
    ChangeRequest {
        change_ip: bool,
        change_port: bool,
    },
    Opaque(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub kind: u16,
    pub value: Value,
}

impl Attribute {
    /// Write `type(u16) | length(u16) | value`. No padding between
    /// attributes.
    pub fn encode(&self, buf: &mut ByteBuffer) -> Result<(), Error> {
        buf.reserve(ATTRIBUTE_HEADER_LENGTH)?;
        buf.write_u16(self.kind.to_be())?;

        let length_offset = buf.readable();
        buf.write_u16(0)?;

        let value_start = buf.readable();
        match &self.value {
            Value::Address { family, port, ipv4 } => {
                buf.reserve(8)?;
                buf.write_u8(0)?;
                buf.write_u8(*family)?;
                buf.write_u16(port.to_be())?;
                buf.write_u32(u32::from(*ipv4).to_be())?;
            }
            Value::ChangeRequest {
                change_ip,
                change_port,
            } => {
                let flags: u32 =
                    (if *change_ip { 0x4 } else { 0 }) | (if *change_port { 0x2 } else { 0 });
                buf.reserve(4)?;
                buf.write_u32(flags.to_be())?;
            }
            Value::Opaque(bytes) => {
                buf.reserve(bytes.len())?;
                buf.write_bytes(bytes)?;
            }
        }

        let value_len = (buf.readable() - value_start) as u16;
        buf.update_u16(length_offset, value_len.to_be())?;
        Ok(())
    }

    /// Peek the type code, choose a subtype decoder, then read and verify
    /// the declared length is consistent with that subtype's fixed shape.
    pub fn decode(buf: &mut ByteBuffer) -> Result<Self, Error> {
        let kind = u16::from_be(buf.read_u16()?);
        let length = u16::from_be(buf.read_u16()?) as usize;

        if buf.readable() < length {
            return Err(Error::LengthMismatch);
        }

        let recognized = AttributeType::try_from(kind);

        let value = match recognized {
            Ok(attr) if attr.is_address() => {
                if length != 8 {
                    return Err(Error::LengthMismatch);
                }

                let _padding = buf.read_u8()?;
                let family = buf.read_u8()?;
                let port = u16::from_be(buf.read_u16()?);
                let ipv4 = Ipv4Addr::from(u32::from_be(buf.read_u32()?));

                Value::Address { family, port, ipv4 }
            }
            Ok(AttributeType::ChangeRequest) => {
                if length != 4 {
                    return Err(Error::LengthMismatch);
                }

                let flags = u32::from_be(buf.read_u32()?);
                Value::ChangeRequest {
                    change_ip: flags & 0x4 != 0,
                    change_port: flags & 0x2 != 0,
                }
            }
            Ok(_) => Value::Opaque(read_opaque(buf, length)?),
            Err(_) if kind <= 0x7fff => return Err(Error::UnknownMandatoryAttribute),
            Err(_) => Value::Opaque(read_opaque(buf, length)?),
        };

        Ok(Self { kind, value })
    }
}

fn read_opaque(buf: &mut ByteBuffer, length: usize) -> Result<Vec<u8>, Error> {
    let mut bytes = vec![0u8; length];
    buf.read_bytes(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_attribute_round_trips() {
        let attribute = Attribute {
            kind: AttributeType::MappedAddress as u16,
            value: Value::Address {
                family: 1,
                port: 40001,
                ipv4: Ipv4Addr::new(203, 0, 113, 5),
            },
        };

        let mut buf = ByteBuffer::new();
        attribute.encode(&mut buf).unwrap();

        assert_eq!(buf.readable(), ATTRIBUTE_HEADER_LENGTH + 8);

        let decoded = Attribute::decode(&mut buf).unwrap();
        assert_eq!(decoded, attribute);
    }

    #[test]
    fn change_request_shape_has_only_meaningful_bits() {
        let attribute = Attribute {
            kind: AttributeType::ChangeRequest as u16,
            value: Value::ChangeRequest {
                change_ip: true,
                change_port: true,
            },
        };

        let mut buf = ByteBuffer::new();
        attribute.encode(&mut buf).unwrap();

        let flags = u32::from_be(buf.peek_u32(ATTRIBUTE_HEADER_LENGTH).unwrap());
        assert_eq!(flags, 0x6);
        assert_eq!(flags & !0x6, 0);
    }

    #[test]
    fn unrecognized_optional_attribute_is_opaque() {
        let mut buf = ByteBuffer::new();
        buf.reserve(ATTRIBUTE_HEADER_LENGTH + 2).unwrap();
        buf.write_u16(0x8022u16.to_be()).unwrap();
        buf.write_u16(2u16.to_be()).unwrap();
        buf.write_bytes(&[0xaa, 0xbb]).unwrap();

        let decoded = Attribute::decode(&mut buf).unwrap();
        assert_eq!(decoded.value, Value::Opaque(vec![0xaa, 0xbb]));
    }

    #[test]
    fn unrecognized_mandatory_attribute_is_rejected() {
        let mut buf = ByteBuffer::new();
        buf.reserve(ATTRIBUTE_HEADER_LENGTH).unwrap();
        buf.write_u16(0x0020u16.to_be()).unwrap();
        buf.write_u16(0u16.to_be()).unwrap();

        assert!(matches!(
            Attribute::decode(&mut buf),
            Err(Error::UnknownMandatoryAttribute)
        ));
    }
}
