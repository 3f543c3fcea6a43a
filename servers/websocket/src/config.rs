#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WebSocketServerConfig {
    pub binary_buffer_size: usize,
    pub text_buffer_size: usize,
    /// When true, the first handshake permanently closes endpoint
    /// registration.
    pub enforce_no_add_after_handshake: bool,
}

impl Default for WebSocketServerConfig {
    fn default() -> Self {
        Self {
            binary_buffer_size: 8192,
            text_buffer_size: 8192,
            enforce_no_add_after_handshake: false,
        }
    }
}
