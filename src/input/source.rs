use std::fs::File;
use std::io::{self, Read};

use crate::config::Config;
use crate::ssh::{self, SessionGuard};

/// Byte stream of raw input events from one device node.
pub enum InputSource {
    /// Running on the tablet itself.
    Local(File),
    /// Streaming from a tablet over SSH.
    Remote {
        _session: SessionGuard,
        channel: ssh2::Channel,
    },
}

impl InputSource {
    pub fn open(device_path: &str, config: &Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if config.local {
            log::info!("Opening {}", device_path);
            return Ok(InputSource::Local(File::open(device_path)?));
        }
        let (session, channel) = ssh::open_input_stream(device_path, config)?;
        Ok(InputSource::Remote {
            _session: session,
            channel,
        })
    }
}

impl Read for InputSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            InputSource::Local(file) => file.read(buf),
            InputSource::Remote { channel, .. } => channel.read(buf),
        }
    }
}
