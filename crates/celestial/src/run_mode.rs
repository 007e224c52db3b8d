use std::fmt;

/// Which service this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// WebSocket live video relay.
    Relay,
    /// HTTP frame batch receiver.
    Receiver,
    /// Minute-aligned camera capture with segment upload.
    Monitor,
    /// Live camera frames pushed to the relay.
    Stream,
    /// Still frames captured and posted to the receiver in one batch.
    Batch,
}

impl RunMode {
    /// Parse a command-line mode name.
    pub fn parse(arg: &str) -> Option<Self> {
        match arg {
            "relay" => Some(RunMode::Relay),
            "receiver" => Some(RunMode::Receiver),
            "monitor" => Some(RunMode::Monitor),
            "stream" => Some(RunMode::Stream),
            "batch" => Some(RunMode::Batch),
            _ => None,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Relay => "relay",
            RunMode::Receiver => "receiver",
            RunMode::Monitor => "monitor",
            RunMode::Stream => "stream",
            RunMode::Batch => "batch",
        };
        f.write_str(name)
    }
}
