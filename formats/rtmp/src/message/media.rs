use tokio_util::bytes::BytesMut;

/// Audio codec id from the high nibble of the first payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    LinearPcm,
    AdPcm,
    Mp3,
    LinearPcmLe,
    Nellymoser16kHz,
    Nellymoser8kHz,
    Nellymoser,
    G711A,
    G711U,
    Aac,
    Speex,
    Mp38kHz,
    DeviceSpecific,
    Unknown(u8),
}

impl From<u8> for AudioCodec {
    fn from(value: u8) -> Self {
        match value {
            0 => AudioCodec::LinearPcm,
            1 => AudioCodec::AdPcm,
            2 => AudioCodec::Mp3,
            3 => AudioCodec::LinearPcmLe,
            4 => AudioCodec::Nellymoser16kHz,
            5 => AudioCodec::Nellymoser8kHz,
            6 => AudioCodec::Nellymoser,
            7 => AudioCodec::G711A,
            8 => AudioCodec::G711U,
            10 => AudioCodec::Aac,
            11 => AudioCodec::Speex,
            14 => AudioCodec::Mp38kHz,
            15 => AudioCodec::DeviceSpecific,
            value => AudioCodec::Unknown(value),
        }
    }
}

/// Video frame type from the high nibble of the first payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFrameType {
    Key,
    Inter,
    DisposableInter,
    Generated,
    Info,
    Unknown(u8),
}

impl From<u8> for VideoFrameType {
    fn from(value: u8) -> Self {
        match value {
            1 => VideoFrameType::Key,
            2 => VideoFrameType::Inter,
            3 => VideoFrameType::DisposableInter,
            4 => VideoFrameType::Generated,
            5 => VideoFrameType::Info,
            value => VideoFrameType::Unknown(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    H263,
    ScreenVideo,
    Vp6,
    Vp6Alpha,
    ScreenVideo2,
    Avc,
    Unknown(u8),
}

impl From<u8> for VideoCodec {
    fn from(value: u8) -> Self {
        match value {
            2 => VideoCodec::H263,
            3 => VideoCodec::ScreenVideo,
            4 => VideoCodec::Vp6,
            5 => VideoCodec::Vp6Alpha,
            6 => VideoCodec::ScreenVideo2,
            7 => VideoCodec::Avc,
            value => VideoCodec::Unknown(value),
        }
    }
}

/// A demuxed audio message. The payload is owned; nothing borrows the
/// transport buffer once the message is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioData {
    pub codec: AudioCodec,
    /// AAC audio specific config rather than coded samples.
    pub is_sequence_header: bool,
    pub payload: BytesMut,
}

impl AudioData {
    pub fn parse(payload: BytesMut) -> Self {
        let codec = payload
            .first()
            .map(|byte| AudioCodec::from(byte >> 4))
            .unwrap_or(AudioCodec::Unknown(0xFF));
        let is_sequence_header =
            codec == AudioCodec::Aac && payload.len() >= 2 && payload[1] == 0;
        Self {
            codec,
            is_sequence_header,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoData {
    pub frame_type: VideoFrameType,
    pub codec: VideoCodec,
    /// AVC decoder configuration record rather than coded pictures.
    pub is_sequence_header: bool,
    pub is_end_of_sequence: bool,
    pub payload: BytesMut,
}

impl VideoData {
    pub fn parse(payload: BytesMut) -> Self {
        let (frame_type, codec) = payload
            .first()
            .map(|byte| (VideoFrameType::from(byte >> 4), VideoCodec::from(byte & 0x0F)))
            .unwrap_or((VideoFrameType::Unknown(0xFF), VideoCodec::Unknown(0xFF)));
        let avc_packet_type = if codec == VideoCodec::Avc && payload.len() >= 2 {
            Some(payload[1])
        } else {
            None
        };
        Self {
            frame_type,
            codec,
            is_sequence_header: avc_packet_type == Some(0),
            is_end_of_sequence: avc_packet_type == Some(2),
            payload,
        }
    }
}
