// src/transport.rs - One-shot serial transport for a single query cycle
use serial2_tokio::{CharSize, FlowControl, Parity, SerialPort, Settings, StopBits};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};

use crate::config::SerialEndpointConfig;

/// Grace period used to drain bytes that are still trickling in after the
/// first chunk of a reply.
const DRAIN_GRACE: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial port: {0}")]
    Open(std::io::Error),
    #[error("serial write failed: {0}")]
    Write(std::io::Error),
    #[error("serial write timed out")]
    WriteTimeout,
    #[error("serial read failed: {0}")]
    Read(std::io::Error),
    #[error("serial read timed out")]
    ReadTimeout,
}

impl TransportError {
    /// Read timeouts are the one non-fatal transport outcome; "no data" is
    /// normal for an unreachable or busy controller.
    pub fn is_read_timeout(&self) -> bool {
        matches!(self, TransportError::ReadTimeout)
    }
}

/// Exclusive handle on the physical serial device for one query cycle.
///
/// Dropping the transport closes the device, so every exit path (including
/// errors and caller-side cancellation) releases the port.
pub struct SerialTransport {
    port: SerialPort,
    read_timeout: Duration,
    write_timeout: Duration,
    settle_delay: Duration,
}

impl SerialTransport {
    /// Open the serial device with the configured parameters.
    pub fn open(config: &SerialEndpointConfig) -> Result<Self, TransportError> {
        let char_size = match config.data_bits {
            5 => CharSize::Bits5,
            6 => CharSize::Bits6,
            7 => CharSize::Bits7,
            _ => CharSize::Bits8,
        };
        let baud = config.baud;

        let port = SerialPort::open(&config.port, move |mut settings: Settings| {
            settings.set_raw();
            settings.set_baud_rate(baud)?;
            settings.set_char_size(char_size);
            settings.set_parity(Parity::None);
            settings.set_stop_bits(StopBits::One);
            settings.set_flow_control(FlowControl::None);
            Ok(settings)
        })
        .map_err(TransportError::Open)?;

        Ok(Self {
            port,
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            settle_delay: config.settle_delay(),
        })
    }

    /// Write a command, CRLF-terminated, bounded by the write timeout.
    pub async fn write(&self, command: &str) -> Result<(), TransportError> {
        let framed = format!("{command}\r\n");
        tracing::debug!("serial TX: {}", command);

        match timeout(self.write_timeout, self.write_all(framed.as_bytes())).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::Write(e)),
            Err(_) => Err(TransportError::WriteTimeout),
        }
    }

    async fn write_all(&self, mut bytes: &[u8]) -> std::io::Result<()> {
        while !bytes.is_empty() {
            let written = self.port.write(bytes).await?;
            if written == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "serial port accepted no bytes",
                ));
            }
            bytes = &bytes[written..];
        }
        Ok(())
    }

    /// Wait out the settle delay, then read whatever the controller has
    /// buffered. The reply carries no terminator, so the contract is
    /// "everything that arrived within the settle window". Errors with
    /// `ReadTimeout` if the read timeout elapses with nothing received.
    pub async fn read_available(&self) -> Result<String, TransportError> {
        sleep(self.settle_delay).await;

        let mut buf = [0u8; 512];
        let mut collected = Vec::new();

        let received = match timeout(self.read_timeout, self.port.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(TransportError::Read(e)),
            Err(_) => return Err(TransportError::ReadTimeout),
        };
        if received == 0 {
            return Err(TransportError::ReadTimeout);
        }
        collected.extend_from_slice(&buf[..received]);

        // Drain until the line goes quiet.
        loop {
            match timeout(DRAIN_GRACE, self.port.read(&mut buf)).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => collected.extend_from_slice(&buf[..n]),
                Ok(Err(e)) => return Err(TransportError::Read(e)),
            }
        }

        let text = String::from_utf8_lossy(&collected).into_owned();
        tracing::trace!("serial RX: {:?}", text);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerialEndpointConfig;

    #[test]
    fn test_open_missing_device_fails() {
        let config = SerialEndpointConfig {
            port: "/dev/haas-telemetry-no-such-device".to_string(),
            ..SerialEndpointConfig::default()
        };

        match SerialTransport::open(&config) {
            Err(TransportError::Open(_)) => {}
            other => panic!("expected Open error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_read_timeout_classification() {
        assert!(TransportError::ReadTimeout.is_read_timeout());
        assert!(!TransportError::WriteTimeout.is_read_timeout());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!TransportError::Open(io).is_read_timeout());
    }
}
