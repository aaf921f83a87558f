use crate::core::channel::{Channel, ChannelStatus};
use crate::domain::error::ChannelError;
use async_trait::async_trait;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Hardware serial implementation of [`Channel`].
///
/// The handle lives behind a short-lived lock; callers serialize whole
/// transactions with the channel gate, so each method here only guards the
/// handle itself. Closing takes the handle out from under a waiting
/// collector, whose next read then fails with `NotOpen`.
pub struct SerialChannel {
    inner: Mutex<Inner>,
}

struct Inner {
    handle: Option<Box<dyn SerialPort>>,
    selected: Option<(String, u32)>,
}

impl SerialChannel {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                handle: None,
                selected: None,
            }),
        }
    }
}

impl Default for SerialChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for SerialChannel {
    async fn open(&self, port: &str, baud: u32, timeout: Duration) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().await;
        // The selection sticks even when the device fails to open
        inner.selected = Some((port.to_string(), baud));
        if inner.handle.is_some() {
            return Err(ChannelError::AlreadyOpen);
        }

        let handle = serialport::new(port, baud)
            .timeout(timeout)
            .open()
            .map_err(map_serial_error)?;
        inner.handle = Some(handle);
        info!(port, baud, "serial channel opened");
        Ok(())
    }

    async fn close(&self) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().await;
        match inner.handle.take() {
            Some(_) => {
                info!("serial channel closed");
                Ok(())
            }
            None => Err(ChannelError::NotOpen),
        }
    }

    async fn status(&self) -> ChannelStatus {
        let inner = self.inner.lock().await;
        if inner.handle.is_some() {
            if let Some((port, baud)) = &inner.selected {
                return ChannelStatus::Open {
                    port: port.clone(),
                    baud: *baud,
                };
            }
        }
        ChannelStatus::Closed {
            selected: inner.selected.as_ref().map(|(port, _)| port.clone()),
        }
    }

    async fn write(&self, bytes: &[u8]) -> Result<usize, ChannelError> {
        let mut inner = self.inner.lock().await;
        let handle = inner.handle.as_mut().ok_or(ChannelError::NotOpen)?;
        handle.write_all(bytes)?;
        handle.flush()?;
        debug!(count = bytes.len(), "serial write");
        Ok(bytes.len())
    }

    async fn read_available(&self) -> Result<Vec<u8>, ChannelError> {
        let mut inner = self.inner.lock().await;
        let handle = inner.handle.as_mut().ok_or(ChannelError::NotOpen)?;

        let waiting = handle.bytes_to_read().map_err(map_serial_error)? as usize;
        if waiting == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; waiting];
        match handle.read(&mut buffer) {
            Ok(count) => {
                buffer.truncate(count);
                debug!(count, "serial read");
                Ok(buffer)
            }
            Err(ref err) if err.kind() == std::io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(err) => Err(ChannelError::Io(err)),
        }
    }

    async fn bytes_waiting(&self) -> Result<usize, ChannelError> {
        let inner = self.inner.lock().await;
        let handle = inner.handle.as_ref().ok_or(ChannelError::NotOpen)?;
        let waiting = handle.bytes_to_read().map_err(map_serial_error)?;
        Ok(waiting as usize)
    }
}

fn map_serial_error(err: serialport::Error) -> ChannelError {
    match err.kind() {
        serialport::ErrorKind::Io(kind) => {
            ChannelError::Io(std::io::Error::new(kind, err.description))
        }
        _ => ChannelError::DeviceUnavailable(err.description),
    }
}
