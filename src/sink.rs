//! The display-update sink boundary.

use std::io;

use crate::waveform::PanelUpdate;

/// Consumer of panel updates. Treated as one serialized resource: the
/// dispatcher never calls `present` concurrently.
pub trait DisplaySink {
    fn present(&mut self, update: &PanelUpdate) -> io::Result<()>;
}

impl<S: DisplaySink + ?Sized> DisplaySink for Box<S> {
    fn present(&mut self, update: &PanelUpdate) -> io::Result<()> {
        (**self).present(update)
    }
}

/// Logs updates instead of driving a panel.
#[derive(Debug, Default)]
pub struct LogSink {
    presented: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl DisplaySink for LogSink {
    fn present(&mut self, update: &PanelUpdate) -> io::Result<()> {
        if self.presented == 0 {
            log::info!("Refresh updates flowing");
        }
        self.presented += 1;

        log::debug!(
            "update #{} waveform={} mode={:?} region={} temp={:#06x} flags={:#010x}",
            update.marker,
            update.waveform,
            update.update_mode,
            update.region,
            update.temp,
            update.flags
        );

        if self.presented.is_multiple_of(500) {
            log::debug!("Refresh updates presented: {}", self.presented);
        }
        Ok(())
    }
}
