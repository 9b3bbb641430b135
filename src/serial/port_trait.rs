//! Write side of the bridge link, behind a trait so the servo writer can
//! run against an in-memory port in tests

use async_trait::async_trait;
use std::io;
use tokio::io::WriteHalf;
use tokio_serial::SerialStream;

/// Outbound byte sink used by the servo writer
#[async_trait]
pub trait SerialPortIO: Send {
    /// Queue one complete frame
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Push queued frames to the device
    async fn flush(&mut self) -> io::Result<()>;
}

/// Write half of the bridge serial stream
pub struct TokioSerialPort {
    port: WriteHalf<SerialStream>,
}

impl TokioSerialPort {
    /// Wrap the write half produced by `BridgeSerial::into_split`
    pub fn new(port: WriteHalf<SerialStream>) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }
}
