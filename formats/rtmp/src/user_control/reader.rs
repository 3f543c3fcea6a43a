use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use utils::traits::reader::ReadFrom;

use crate::message::errors::MessageError;

use super::{SWF_VERIFICATION_PAYLOAD_LENGTH, UserControlEvent};

impl<R: io::Read> ReadFrom<R> for UserControlEvent {
    type Error = MessageError;
    fn read_from(reader: &mut R) -> Result<Self, Self::Error> {
        let event_type = reader.read_u16::<BigEndian>()?;
        let event = match event_type {
            0 => UserControlEvent::StreamBegin {
                stream_id: reader.read_u32::<BigEndian>()?,
            },
            1 => UserControlEvent::StreamEof {
                stream_id: reader.read_u32::<BigEndian>()?,
            },
            2 => UserControlEvent::StreamDry {
                stream_id: reader.read_u32::<BigEndian>()?,
            },
            3 => UserControlEvent::SetBufferLength {
                stream_id: reader.read_u32::<BigEndian>()?,
                buffer_length: reader.read_u32::<BigEndian>()?,
            },
            4 => UserControlEvent::StreamIsRecorded {
                stream_id: reader.read_u32::<BigEndian>()?,
            },
            6 => UserControlEvent::PingRequest {
                timestamp: reader.read_u32::<BigEndian>()?,
            },
            7 => UserControlEvent::PingResponse {
                timestamp: reader.read_u32::<BigEndian>()?,
            },
            26 => UserControlEvent::SwfVerificationRequest,
            27 => {
                let mut payload = vec![0; SWF_VERIFICATION_PAYLOAD_LENGTH];
                reader.read_exact(&mut payload)?;
                UserControlEvent::SwfVerificationResponse { payload }
            }
            event_type => UserControlEvent::Unknown {
                event_type,
                value: reader.read_u32::<BigEndian>()?,
            },
        };
        Ok(event)
    }
}
