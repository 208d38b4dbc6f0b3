use anyhow::Result;
use std::net::Ipv4Addr;
use stun_probe_codec::buffer::ByteBuffer;
use stun_probe_codec::message::attributes::{Attribute, AttributeType, Value};
use stun_probe_codec::message::{Message, MessageType, TransactionId};

fn mapped_address(port: u16, ipv4: Ipv4Addr) -> Attribute {
    Attribute {
        kind: AttributeType::MappedAddress as u16,
        value: Value::Address {
            family: 1,
            port,
            ipv4,
        },
    }
}

#[test]
fn binding_request_with_change_request_round_trips() -> Result<()> {
    let id = TransactionId::generate();
    let message = Message::binding_request(id).with_change_request(true, true);

    let mut buf = ByteBuffer::new();
    message.encode(&mut buf)?;

    let decoded = Message::decode(&mut buf)?;
    assert_eq!(decoded.message_type(), MessageType::BindingRequest);
    assert_eq!(decoded.transaction_id(), id);
    assert_eq!(
        decoded.get(AttributeType::ChangeRequest).unwrap().value,
        Value::ChangeRequest {
            change_ip: true,
            change_port: true,
        }
    );

    Ok(())
}

#[test]
fn binding_response_carries_mapped_and_changed_address() -> Result<()> {
    let id = TransactionId::generate();
    let mut message = Message::new(MessageType::BindingResponse, id);

    message.push(mapped_address(40001, Ipv4Addr::new(203, 0, 113, 5)));
    message.push(Attribute {
        kind: AttributeType::ChangedAddress as u16,
        value: Value::Address {
            family: 1,
            port: 3479,
            ipv4: Ipv4Addr::new(198, 51, 100, 2),
        },
    });

    let mut buf = ByteBuffer::new();
    message.encode(&mut buf)?;

    let declared_len = u16::from_be(buf.peek_u16(2)?) as usize;
    assert_eq!(buf.readable(), 20 + declared_len);
    assert_eq!(declared_len, 2 * (4 + 8));

    let decoded = Message::decode(&mut buf)?;
    assert_eq!(decoded.message_type(), MessageType::BindingResponse);
    assert_eq!(
        decoded.get(AttributeType::MappedAddress).unwrap().value,
        Value::Address {
            family: 1,
            port: 40001,
            ipv4: Ipv4Addr::new(203, 0, 113, 5),
        }
    );
    assert_eq!(
        decoded.get(AttributeType::ChangedAddress).unwrap().value,
        Value::Address {
            family: 1,
            port: 3479,
            ipv4: Ipv4Addr::new(198, 51, 100, 2),
        }
    );

    Ok(())
}

#[test]
fn binding_error_response_decodes_with_opaque_error_code() -> Result<()> {
    let id = TransactionId::generate();
    let mut message = Message::new(MessageType::BindingErrorResponse, id);

    message.push(Attribute {
        kind: AttributeType::ErrorCode as u16,
        value: Value::Opaque(vec![0x00, 0x00, 0x04, 0x00]),
    });

    let mut buf = ByteBuffer::new();
    message.encode(&mut buf)?;

    let decoded = Message::decode(&mut buf)?;
    assert_eq!(decoded.message_type(), MessageType::BindingErrorResponse);
    assert_eq!(
        decoded.get(AttributeType::ErrorCode).unwrap().value,
        Value::Opaque(vec![0x00, 0x00, 0x04, 0x00])
    );

    Ok(())
}

#[test]
fn truncated_header_is_a_short_buffer_error() {
    let mut buf = ByteBuffer::new();
    buf.reserve(10).unwrap();
    buf.write_bytes(&[0u8; 10]).unwrap();

    assert!(matches!(
        Message::decode(&mut buf),
        Err(stun_probe_codec::Error::ShortBuffer)
    ));
}
