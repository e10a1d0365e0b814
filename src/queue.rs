//! Report delivery queue and the consumer-side inbox.
//!
//! Every report control block pushes its reports into a bounded
//! [`ReportQueue`]. Pushing never blocks: when the queue is full the oldest
//! report is evicted, which shows up at the consumer as a jump in sequence
//! numbers. The owning sink drains the queue through a [`ReportInbox`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::types::Report;

#[derive(Debug, Default)]
struct QueueInner {
    reports: VecDeque<Report>,
    evicted: u64,
    closed: bool,
}

/// Bounded drop-oldest report queue.
#[derive(Debug)]
pub(crate) struct ReportQueue {
    capacity: usize,
    inner: Mutex<QueueInner>,
    notify: Notify,
}

impl ReportQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(QueueInner {
                reports: VecDeque::with_capacity(capacity),
                ..Default::default()
            }),
            notify: Notify::new(),
        }
    }

    /// Append a report, returning the evicted one if the queue was full.
    pub(crate) fn push(&self, report: Report) -> Option<Report> {
        let evicted = {
            let mut inner = self.inner.lock();
            let evicted = if inner.reports.len() >= self.capacity {
                inner.evicted += 1;
                inner.reports.pop_front()
            } else {
                None
            };
            inner.reports.push_back(report);
            evicted
        };
        self.notify.notify_one();
        evicted
    }

    pub(crate) fn pop(&self) -> Option<Report> {
        self.inner.lock().reports.pop_front()
    }

    pub(crate) fn take_all(&self) -> Vec<Report> {
        self.inner.lock().reports.drain(..).collect()
    }

    /// Stop accepting wake-ups for new reports. Queued reports stay
    /// drainable.
    pub(crate) fn close(&self) {
        self.inner.lock().closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().reports.len()
    }

    pub(crate) fn evicted(&self) -> u64 {
        self.inner.lock().evicted
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consumer handle for the reports of one report control block.
///
/// Reports come out oldest first. The inbox tracks the last sequence number
/// it handed out so lost reports can be counted without extra messages.
#[derive(Debug)]
pub struct ReportInbox {
    rpt_id: String,
    queue: Arc<ReportQueue>,
    last_sequence: Option<u64>,
    missed: u64,
}

impl ReportInbox {
    pub(crate) fn new(rpt_id: impl Into<String>, queue: Arc<ReportQueue>) -> Self {
        Self {
            rpt_id: rpt_id.into(),
            queue,
            last_sequence: None,
            missed: 0,
        }
    }

    /// Report ID of the RCB feeding this inbox.
    pub fn rpt_id(&self) -> &str {
        &self.rpt_id
    }

    /// Take the oldest queued report without waiting.
    pub fn try_recv(&mut self) -> Option<Report> {
        let report = self.queue.pop()?;
        self.track(&report);
        Some(report)
    }

    /// Take every queued report, oldest first.
    pub fn drain(&mut self) -> Vec<Report> {
        let reports = self.queue.take_all();
        for report in &reports {
            self.track(report);
        }
        reports
    }

    /// Wait for the next report.
    ///
    /// Returns `None` once the RCB has been released and the queue is empty.
    pub async fn recv(&mut self) -> Option<Report> {
        let queue = Arc::clone(&self.queue);
        loop {
            let notified = queue.notify.notified();
            if let Some(report) = self.try_recv() {
                return Some(report);
            }
            if self.queue.is_closed() {
                return None;
            }
            notified.await;
        }
    }

    /// Wait for the next report for at most `timeout`.
    ///
    /// Returns `None` on timeout or when the queue is closed and empty.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Report> {
        tokio::time::timeout(timeout, self.recv())
            .await
            .ok()
            .flatten()
    }

    /// Turn the inbox into a stream of reports.
    pub fn into_stream(self) -> impl Stream<Item = Report> {
        futures::stream::unfold(self, |mut inbox| async move {
            let report = inbox.recv().await?;
            Some((report, inbox))
        })
    }

    /// Number of reports currently queued.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if no report is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue capacity.
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Number of reports evicted from the queue because it was full.
    pub fn evicted(&self) -> u64 {
        self.queue.evicted()
    }

    /// Number of reports skipped between the ones received so far,
    /// derived from sequence number gaps.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// Sequence number of the last received report.
    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    /// Check if the RCB has been released. Queued reports can still be taken.
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    fn track(&mut self, report: &Report) {
        if let Some(last) = self.last_sequence {
            if report.sequence_number > last + 1 {
                self.missed += report.sequence_number - last - 1;
            }
        }
        self.last_sequence = Some(report.sequence_number);
    }
}
