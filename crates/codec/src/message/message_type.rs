use crate::Error;

/// STUN message types (RFC 3489 §11.1).
///
/// Only the six types the client core recognizes: the Binding exchange
/// this client drives, and the SharedSecret exchange, whose type codes are
/// part of the data model but whose TLS/credential semantics are out of
/// scope — a SharedSecret response decodes like any other message, its
/// attributes carried opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    BindingRequest,
    BindingResponse,
    BindingErrorResponse,
    SharedSecretRequest,
    SharedSecretResponse,
    SharedSecretErrorResponse,
}

impl TryFrom<u16> for MessageType {
    type Error = Error;

    /// # Test
    ///
    /// ```
    /// use stun_probe_codec::message::MessageType;
    ///
    /// assert_eq!(MessageType::try_from(0x0001).unwrap(), MessageType::BindingRequest);
    /// assert_eq!(MessageType::try_from(0x0101).unwrap(), MessageType::BindingResponse);
    /// assert_eq!(MessageType::try_from(0x0111).unwrap(), MessageType::BindingErrorResponse);
    /// assert!(MessageType::try_from(0x0003).is_err());
    /// ```
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0x0001 => Self::BindingRequest,
            0x0101 => Self::BindingResponse,
            0x0111 => Self::BindingErrorResponse,
            0x0002 => Self::SharedSecretRequest,
            0x0102 => Self::SharedSecretResponse,
            0x0112 => Self::SharedSecretErrorResponse,
            _ => return Err(Error::UnknownMessageType),
        })
    }
}

impl From<MessageType> for u16 {
    /// # Test
    ///
    /// ```
    /// use stun_probe_codec::message::MessageType;
    ///
    /// assert_eq!(0x0001u16, MessageType::BindingRequest.into());
    /// assert_eq!(0x0101u16, MessageType::BindingResponse.into());
    /// assert_eq!(0x0111u16, MessageType::BindingErrorResponse.into());
    /// ```
    fn from(value: MessageType) -> u16 {
        match value {
            MessageType::BindingRequest => 0x0001,
            MessageType::BindingResponse => 0x0101,
            MessageType::BindingErrorResponse => 0x0111,
            MessageType::SharedSecretRequest => 0x0002,
            MessageType::SharedSecretResponse => 0x0102,
            MessageType::SharedSecretErrorResponse => 0x0112,
        }
    }
}
