use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use utils::traits::writer::WriteTo;

use crate::message::errors::MessageError;

use super::ProtocolControlMessage;

impl<W: io::Write> WriteTo<W> for ProtocolControlMessage {
    type Error = MessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        match self {
            ProtocolControlMessage::SetChunkSize(message) => {
                writer.write_u32::<BigEndian>(message.chunk_size & 0x7FFF_FFFF)?;
            }
            ProtocolControlMessage::Abort(message) => {
                writer.write_u32::<BigEndian>(message.chunk_stream_id)?;
            }
            ProtocolControlMessage::Ack(message) => {
                writer.write_u32::<BigEndian>(message.sequence_number)?;
            }
            ProtocolControlMessage::WindowAckSize(message) => {
                writer.write_u32::<BigEndian>(message.size)?;
            }
            ProtocolControlMessage::SetPeerBandwidth(message) => {
                writer.write_u32::<BigEndian>(message.size)?;
                writer.write_u8(message.limit_type as u8)?;
            }
        }
        Ok(())
    }
}
