//! Bounded, coalescing queue between the waveform policy and the sink.
//!
//! Producers block in [`RefreshDispatcher::submit`] while the queue is
//! full, up to a bounded wait. A single drainer forwards requests in
//! ascending sequence order.

use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::sink::DisplaySink;
use crate::waveform::{PanelUpdate, RefreshRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    pub capacity: usize,
    pub submit_timeout: Duration,
    /// How long the oldest request waits for overlapping ones to merge.
    pub coalesce_window: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            submit_timeout: Duration::from_millis(200),
            coalesce_window: Duration::from_millis(8),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub submitted: u64,
    pub merged: u64,
    pub forwarded: u64,
}

struct Pending {
    request: RefreshRequest,
    queued_at: Instant,
}

struct Queue {
    /// Keyed by (sequence, arrival) so equal sequences keep arrival order.
    pending: BTreeMap<(u64, u64), Pending>,
    arrivals: u64,
    /// Highest sequence already forwarded.
    floor: u64,
    closed: bool,
    stats: DispatchStats,
}

impl Queue {
    /// Fold `req` into the newest pending request it overlaps, if their
    /// modes are compatible. An incompatible overlap blocks the merge so
    /// mode transitions reach the panel in order.
    fn merge(&mut self, req: &RefreshRequest) -> bool {
        for pending in self.pending.values_mut().rev() {
            let queued = &mut pending.request;
            if !queued.region.intersects(&req.region) {
                continue;
            }
            if !queued.mode.compatible(req.mode) {
                return false;
            }
            log::debug!(
                "Merging refresh #{} ({} over {}) into #{} ({} over {})",
                req.sequence,
                req.mode,
                req.region,
                queued.sequence,
                queued.mode,
                queued.region
            );
            queued.region = queued.region.union(&req.region);
            queued.mode = queued.mode.max_fidelity(req.mode);
            queued.dither |= req.dither;
            return true;
        }
        false
    }

    fn push(&mut self, mut req: RefreshRequest) {
        if req.sequence < self.floor {
            log::warn!(
                "Refresh #{} arrived after #{} was forwarded; sending it as #{}",
                req.sequence,
                self.floor,
                self.floor
            );
            req.sequence = self.floor;
        }
        let key = (req.sequence, self.arrivals);
        self.arrivals += 1;
        self.pending.insert(
            key,
            Pending {
                request: req,
                queued_at: Instant::now(),
            },
        );
    }

    fn pop(&mut self) -> Option<RefreshRequest> {
        let (_, pending) = self.pending.pop_first()?;
        self.floor = self.floor.max(pending.request.sequence);
        Some(pending.request)
    }
}

pub struct RefreshDispatcher {
    config: DispatchConfig,
    queue: Mutex<Queue>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl RefreshDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            queue: Mutex::new(Queue {
                pending: BTreeMap::new(),
                arrivals: 0,
                floor: 0,
                closed: false,
                stats: DispatchStats::default(),
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a request, merging it into an overlapping one when possible.
    ///
    /// Blocks while the queue is full; fails with [`Error::SinkBusy`]
    /// once the configured wait expires. The request is never dropped
    /// silently.
    pub fn submit(&self, req: RefreshRequest) -> Result<(), Error> {
        let mut queue = self.lock();
        if queue.closed {
            return Err(Error::Closed);
        }

        if !self.try_accept(&mut queue, &req) {
            let capacity = self.config.capacity;
            let (guard, _) = self
                .not_full
                .wait_timeout_while(queue, self.config.submit_timeout, |q| {
                    q.pending.len() >= capacity && !q.closed
                })
                .unwrap_or_else(PoisonError::into_inner);
            queue = guard;

            if queue.closed {
                return Err(Error::Closed);
            }
            if !self.try_accept(&mut queue, &req) {
                log::warn!(
                    "Display sink busy: refresh #{} ({} over {}) not queued after {:?}",
                    req.sequence,
                    req.mode,
                    req.region,
                    self.config.submit_timeout
                );
                return Err(Error::SinkBusy {
                    waited: self.config.submit_timeout,
                    unsent: vec![req],
                });
            }
        }

        queue.stats.submitted += 1;
        drop(queue);
        self.not_empty.notify_one();
        Ok(())
    }

    fn try_accept(&self, queue: &mut Queue, req: &RefreshRequest) -> bool {
        if queue.merge(req) {
            queue.stats.merged += 1;
            return true;
        }
        if queue.pending.len() >= self.config.capacity {
            return false;
        }
        queue.push(*req);
        true
    }

    /// Forward everything queued right now, ignoring the coalesce window.
    pub fn drain_ready<S: DisplaySink + ?Sized>(&self, sink: &mut S) -> Result<usize, Error> {
        let mut forwarded = 0;
        while let Some(req) = self.pop_now() {
            self.forward(sink, &req)?;
            forwarded += 1;
        }
        Ok(forwarded)
    }

    /// Drain into `sink` until [`close`](Self::close) is called and the
    /// queue is empty. Sink failures are logged and do not stop the loop.
    pub fn run<S: DisplaySink + ?Sized>(&self, sink: &mut S) {
        log::info!("Refresh dispatcher started");
        while let Some(req) = self.next_ready() {
            if let Err(e) = self.forward(sink, &req) {
                log::error!(
                    "Refresh #{} ({} over {}) failed: {}",
                    req.sequence,
                    req.mode,
                    req.region,
                    e
                );
            }
        }
        log::info!("Refresh dispatcher stopped");
    }

    fn pop_now(&self) -> Option<RefreshRequest> {
        let req = self.lock().pop();
        if req.is_some() {
            self.not_full.notify_all();
        }
        req
    }

    fn next_ready(&self) -> Option<RefreshRequest> {
        let window = self.config.coalesce_window;
        let mut queue = self.lock();
        loop {
            let ready_at = queue.pending.first_key_value().map(|(_, p)| p.queued_at + window);
            match ready_at {
                Some(ready_at) => {
                    let now = Instant::now();
                    if now >= ready_at || queue.closed {
                        let req = queue.pop();
                        drop(queue);
                        self.not_full.notify_all();
                        return req;
                    }
                    queue = self
                        .not_empty
                        .wait_timeout(queue, ready_at - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
                None if queue.closed => return None,
                None => {
                    queue = self.not_empty.wait(queue).unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    fn forward<S: DisplaySink + ?Sized>(&self, sink: &mut S, req: &RefreshRequest) -> Result<(), Error> {
        sink.present(&PanelUpdate::from(req))?;
        self.lock().stats.forwarded += 1;
        Ok(())
    }

    /// Stop accepting requests; the drainer finishes what is queued.
    pub fn close(&self) {
        self.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn stats(&self) -> DispatchStats {
        self.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Region;
    use crate::sink::testing::RecordingSink;
    use crate::waveform::WaveformMode;
    use std::sync::Arc;
    use std::thread;

    fn req(sequence: u64, mode: WaveformMode, region: Region) -> RefreshRequest {
        RefreshRequest {
            region,
            mode,
            dither: false,
            sequence,
        }
    }

    fn dispatcher() -> RefreshDispatcher {
        RefreshDispatcher::new(DispatchConfig {
            coalesce_window: Duration::ZERO,
            ..DispatchConfig::default()
        })
    }

    #[test]
    fn test_drains_in_sequence_order() {
        let d = dispatcher();
        d.submit(req(3, WaveformMode::Gc16, Region::new(0, 0, 10, 10))).unwrap();
        d.submit(req(1, WaveformMode::A2, Region::new(100, 0, 10, 10))).unwrap();
        d.submit(req(2, WaveformMode::Du, Region::new(200, 0, 10, 10))).unwrap();

        let mut sink = RecordingSink::default();
        assert_eq!(d.drain_ready(&mut sink).unwrap(), 3);
        assert_eq!(sink.markers(), vec![1, 2, 3]);
    }

    #[test]
    fn test_overlapping_compatible_requests_merge() {
        let d = dispatcher();
        d.submit(req(1, WaveformMode::A2, Region::new(0, 0, 20, 20))).unwrap();
        d.submit(req(2, WaveformMode::Du, Region::new(10, 10, 20, 20))).unwrap();
        assert_eq!(d.pending_len(), 1);

        let mut sink = RecordingSink::default();
        d.drain_ready(&mut sink).unwrap();
        assert_eq!(sink.updates.len(), 1);
        assert_eq!(sink.updates[0].region, Region::new(0, 0, 30, 30));
        assert_eq!(sink.updates[0].waveform, WaveformMode::Du.code());
        assert_eq!(d.stats(), DispatchStats { submitted: 2, merged: 1, forwarded: 1 });
    }

    #[test]
    fn test_incompatible_overlap_is_not_merged() {
        let d = dispatcher();
        let region = Region::new(0, 0, 20, 20);
        d.submit(req(1, WaveformMode::A2, region)).unwrap();
        d.submit(req(2, WaveformMode::Gc16, region)).unwrap();
        d.submit(req(3, WaveformMode::A2, region)).unwrap();

        let mut sink = RecordingSink::default();
        d.drain_ready(&mut sink).unwrap();
        assert_eq!(sink.markers(), vec![1, 2, 3]);
    }

    #[test]
    fn test_late_request_never_goes_backwards() {
        let d = dispatcher();
        let mut sink = RecordingSink::default();
        d.submit(req(5, WaveformMode::Gc16, Region::new(0, 0, 10, 10))).unwrap();
        d.drain_ready(&mut sink).unwrap();
        d.submit(req(2, WaveformMode::Gc16, Region::new(50, 50, 10, 10))).unwrap();
        d.drain_ready(&mut sink).unwrap();
        assert_eq!(sink.markers(), vec![5, 5]);
    }

    #[test]
    fn test_full_queue_reports_sink_busy() {
        let d = RefreshDispatcher::new(DispatchConfig {
            capacity: 1,
            submit_timeout: Duration::from_millis(20),
            coalesce_window: Duration::ZERO,
        });
        d.submit(req(1, WaveformMode::Gc16, Region::new(0, 0, 10, 10))).unwrap();

        let rejected = req(2, WaveformMode::Gc16, Region::new(500, 500, 10, 10));
        match d.submit(rejected) {
            Err(Error::SinkBusy { unsent, .. }) => assert_eq!(unsent, vec![rejected]),
            other => panic!("expected SinkBusy, got {:?}", other),
        }

        // A mergeable request still fits.
        d.submit(req(3, WaveformMode::Gc4, Region::new(5, 5, 10, 10))).unwrap();
    }

    #[test]
    fn test_blocked_submit_resumes_when_drained() {
        let d = Arc::new(RefreshDispatcher::new(DispatchConfig {
            capacity: 1,
            submit_timeout: Duration::from_secs(5),
            coalesce_window: Duration::ZERO,
        }));
        d.submit(req(1, WaveformMode::Gc16, Region::new(0, 0, 10, 10))).unwrap();

        let drainer = {
            let d = Arc::clone(&d);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                let mut sink = RecordingSink::default();
                d.drain_ready(&mut sink).unwrap();
                sink
            })
        };

        d.submit(req(2, WaveformMode::Gc16, Region::new(500, 500, 10, 10))).unwrap();
        let sink = drainer.join().unwrap();
        assert_eq!(sink.markers()[0], 1);
        assert_eq!(d.pending_len() + sink.updates.len(), 2);
    }

    #[test]
    fn test_worker_drains_then_stops_on_close() {
        let d = Arc::new(dispatcher());
        let worker = {
            let d = Arc::clone(&d);
            thread::spawn(move || {
                let mut sink = RecordingSink::default();
                d.run(&mut sink);
                sink
            })
        };

        for (i, left) in [0u32, 100, 200, 300].into_iter().enumerate() {
            d.submit(req(i as u64 + 1, WaveformMode::A2, Region::new(left, 0, 10, 10))).unwrap();
        }
        d.close();
        assert!(matches!(d.submit(req(9, WaveformMode::A2, Region::new(0, 0, 1, 1))), Err(Error::Closed)));

        let sink = worker.join().unwrap();
        assert_eq!(sink.markers(), vec![1, 2, 3, 4]);
    }
}
