//! Channels: synchronous handoff and bounded queues.
//!
//! `unbuffered()` creates a rendezvous channel: `send` returns only once a
//! receiver has taken the value. `bounded(n)` lets `send` complete right away
//! while fewer than `n` values are waiting, and blocks once the buffer is full.
//! Both are `crossbeam` channels underneath.
//!
//! crossbeam only ends a channel when every sender is gone, so explicit close
//! is a thin layer on top: a second, never-used channel whose sender is
//! dropped on `close`. Blocked sends and receives select against it. After
//! `close` every further send fails and receivers stop once the buffer is
//! drained. Dropping the last `Sender` closes the channel as well.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossbeam::channel::{self as cb, select, SelectedOperation};
use tracing::{debug, trace};

use crate::error::{ChannelError, RecvError, RecvTimeoutError, SendError, TryRecvError};

/// Creates a capacity-0 channel.
pub fn unbuffered<T>() -> (Sender<T>, Receiver<T>) {
    bounded(0)
}

/// Creates a channel holding up to `capacity` values. A capacity of 0 is the
/// same as [`unbuffered`].
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = cb::bounded(capacity);
    let (close_tx, close_rx) = cb::bounded(0);
    let shared = Arc::new(Shared {
        close_tx: Mutex::new(Some(close_tx)),
        close_rx,
        senders: AtomicUsize::new(1),
    });
    (
        Sender {
            inner: tx,
            shared: Arc::clone(&shared),
        },
        Receiver { inner: rx, shared },
    )
}

/// Creates a completion signal: the guard sends `true` on the returned
/// receiver when it is dropped or when [`DoneGuard::signal`] is called.
pub fn done_signal() -> (DoneGuard, Receiver<bool>) {
    let (tx, rx) = unbuffered();
    (DoneGuard { tx: Some(tx) }, rx)
}

// =============================================================================
// Close state
// =============================================================================

struct Shared {
    // Nothing is ever sent on this; dropping the sender makes `close_rx`
    // permanently ready.
    close_tx: Mutex<Option<cb::Sender<()>>>,
    close_rx: cb::Receiver<()>,
    senders: AtomicUsize,
}

impl Shared {
    /// Returns `false` if the channel was already closed.
    fn close(&self) -> bool {
        let mut close_tx = self.close_tx.lock().unwrap_or_else(PoisonError::into_inner);
        close_tx.take().is_some()
    }

    fn is_closed(&self) -> bool {
        self.close_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

// =============================================================================
// Sender
// =============================================================================

/// The sending half. Cloning adds another producer to the same channel.
pub struct Sender<T> {
    inner: cb::Sender<T>,
    shared: Arc<Shared>,
}

impl<T> Sender<T> {
    /// Sends a value, blocking while the buffer is full. On a rendezvous
    /// channel this also blocks until a receiver has taken the value.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        if self.shared.is_closed() {
            return Err(SendError::Closed(value));
        }

        let mut sel = cb::Select::new();
        let send = sel.send(&self.inner);
        sel.recv(&self.shared.close_rx);
        let oper = sel.select();

        if oper.index() == send {
            oper.send(&self.inner, value)
                .map_err(|err| SendError::Disconnected(err.into_inner()))
        } else {
            // Closed while we were blocked: the value was never handed over.
            let _ = oper.recv(&self.shared.close_rx);
            Err(SendError::Closed(value))
        }
    }

    /// Marks the channel as finished. Values already buffered can still be
    /// received; any later send fails with [`SendError::Closed`].
    pub fn close(&self) -> Result<(), ChannelError> {
        if !self.shared.close() {
            return Err(ChannelError::AlreadyClosed);
        }
        debug!(buffered = self.inner.len(), "channel closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Values waiting in the buffer. Always 0 on a rendezvous channel.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().unwrap_or_default()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Sender {
            inner: self.inner.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 && self.shared.close() {
            trace!("last sender dropped, closing channel");
        }
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("capacity", &self.capacity())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// =============================================================================
// Receiver
// =============================================================================

/// The receiving half. Cloning adds another consumer; each value is
/// delivered to exactly one receiver.
pub struct Receiver<T> {
    inner: cb::Receiver<T>,
    shared: Arc<Shared>,
}

impl<T> Receiver<T> {
    /// Blocks until a value is available. Fails only once the channel is
    /// closed and every buffered value has been received.
    pub fn recv(&self) -> Result<T, RecvError> {
        select! {
            recv(self.inner) -> value => value.map_err(|_| RecvError),
            recv(self.shared.close_rx) -> _ => self.drain_one(),
        }
    }

    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        match self.inner.try_recv() {
            Ok(value) => Ok(value),
            Err(cb::TryRecvError::Empty) if !self.shared.is_closed() => Err(TryRecvError::Empty),
            Err(_) => Err(TryRecvError::Closed),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        let value = select! {
            recv(self.inner) -> value => value.map_err(|_| RecvError),
            recv(self.shared.close_rx) -> _ => self.drain_one(),
            default(timeout) => return Err(RecvTimeoutError::Timeout),
        };
        value.map_err(|_| RecvTimeoutError::Closed)
    }

    // Once closed, only what is already buffered is left to hand out.
    fn drain_one(&self) -> Result<T, RecvError> {
        self.inner.try_recv().map_err(|_| RecvError)
    }

    /// Iterates until the channel is closed and drained (Go's `range ch`).
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { receiver: self }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Values waiting in the buffer. Always 0 on a rendezvous channel.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().unwrap_or_default()
    }

    /// Adds this receiver to `sel` as two operations, the value and the close
    /// notification, in that order. Returns the index of the first.
    pub(crate) fn register<'a>(&'a self, sel: &mut cb::Select<'a>) -> usize {
        let index = sel.recv(&self.inner);
        sel.recv(&self.shared.close_rx);
        index
    }

    /// Finishes an operation picked from [`Receiver::register`].
    pub(crate) fn complete(
        &self,
        oper: SelectedOperation<'_>,
        closed: bool,
    ) -> Result<T, RecvError> {
        if closed {
            let _ = oper.recv(&self.shared.close_rx);
            self.drain_one()
        } else {
            oper.recv(&self.inner).map_err(|_| RecvError)
        }
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Receiver {
            inner: self.inner.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("capacity", &self.capacity())
            .field("closed", &self.is_closed())
            .finish()
    }
}

pub struct Iter<'a, T> {
    receiver: &'a Receiver<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

pub struct IntoIter<T> {
    receiver: Receiver<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

impl<'a, T> IntoIterator for &'a Receiver<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> IntoIterator for Receiver<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { receiver: self }
    }
}

// =============================================================================
// Done signal
// =============================================================================

/// Sends `true` exactly once: on [`DoneGuard::signal`] or when dropped,
/// which includes early returns and unwinding out of a panic.
#[derive(Debug)]
pub struct DoneGuard {
    tx: Option<Sender<bool>>,
}

impl DoneGuard {
    pub fn signal(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(tx) = self.tx.take() {
            if tx.send(true).is_err() {
                debug!("done signal dropped: nobody is waiting");
            }
        }
    }
}

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.fire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn sum(result: Sender<i32>, a: i32, b: i32) {
        result.send(a + b).unwrap();
    }

    #[test]
    fn test_unbuffered_returns_computed_result() {
        let (tx, rx) = unbuffered();
        thread::spawn(move || sum(tx, 10, 20));
        assert_eq!(rx.recv(), Ok(30));
    }

    #[test]
    fn test_unbuffered_send_waits_for_receiver() {
        let (tx, rx) = unbuffered();
        let delivered = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&delivered);

        let producer = thread::spawn(move || {
            tx.send(42).unwrap();
            flag.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!delivered.load(Ordering::SeqCst));
        assert_eq!(rx.recv(), Ok(42));
        producer.join().unwrap();
        assert!(delivered.load(Ordering::SeqCst));
    }

    #[test]
    fn test_rendezvous_len_stays_zero_while_sender_waits() {
        let (tx, rx) = unbuffered();
        let other = tx.clone();
        let producer = thread::spawn(move || tx.send(1));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(other.len(), 0);
        assert_eq!(rx.len(), 0);
        assert!(rx.is_empty());
        assert_eq!(rx.capacity(), 0);

        assert_eq!(rx.recv(), Ok(1));
        producer.join().unwrap().unwrap();
    }

    #[test]
    fn test_buffered_sends_without_receiver_until_full() {
        let (tx, rx) = bounded(10);
        tx.send("message 1").unwrap();
        tx.send("message 2").unwrap();
        tx.send("message 3").unwrap();
        assert_eq!(tx.len(), 3);
        assert_eq!(rx.capacity(), 10);

        assert_eq!(rx.recv(), Ok("message 1"));
        assert_eq!(rx.recv(), Ok("message 2"));
        tx.close().unwrap();
        assert_eq!(rx.recv(), Ok("message 3"));
        assert_eq!(rx.recv(), Err(RecvError));
    }

    #[test]
    fn test_buffered_send_blocks_when_full() {
        let (tx, rx) = bounded(2);
        tx.send(1).unwrap();
        tx.send(2).unwrap();

        let sent_third = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&sent_third);
        let producer = thread::spawn(move || {
            tx.send(3).unwrap();
            flag.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!sent_third.load(Ordering::SeqCst));
        assert_eq!(rx.recv(), Ok(1));
        producer.join().unwrap();
        assert!(sent_third.load(Ordering::SeqCst));
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_emails_drain_in_order_then_stop() {
        let (tx, rx) = bounded(50);
        for i in 1..5 {
            tx.send(i.to_string()).unwrap();
        }
        tx.close().unwrap();

        let drained: Vec<String> = rx.iter().collect();
        assert_eq!(drained, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_send_after_close_returns_value() {
        let (tx, _rx) = bounded(4);
        tx.close().unwrap();
        let err = tx.send(String::from("late")).unwrap_err();
        assert!(err.is_closed());
        assert_eq!(err.into_inner(), "late");
    }

    #[test]
    fn test_double_close_is_rejected() {
        let (tx, _rx) = bounded::<i32>(1);
        tx.close().unwrap();
        assert_eq!(tx.close(), Err(ChannelError::AlreadyClosed));
    }

    #[test]
    fn test_close_wakes_sender_blocked_on_full_buffer() {
        let (tx, rx) = bounded(1);
        tx.send(1).unwrap();
        let closer = tx.clone();

        let producer = thread::spawn(move || tx.send(2));
        thread::sleep(Duration::from_millis(30));
        closer.close().unwrap();

        let err = producer.join().unwrap().unwrap_err();
        assert_eq!(err, SendError::Closed(2));
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_close_reclaims_pending_rendezvous_value() {
        let (tx, rx) = unbuffered();
        let closer = tx.clone();

        let producer = thread::spawn(move || tx.send(7));
        thread::sleep(Duration::from_millis(30));
        closer.close().unwrap();

        assert_eq!(producer.join().unwrap(), Err(SendError::Closed(7)));
        assert_eq!(rx.recv(), Err(RecvError));
    }

    #[test]
    fn test_dropping_last_sender_closes() {
        let (tx, rx) = bounded(3);
        let tx2 = tx.clone();
        tx.send(1).unwrap();
        drop(tx);
        assert!(!rx.is_closed());
        tx2.send(2).unwrap();
        drop(tx2);
        assert!(rx.is_closed());
        assert_eq!(rx.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_send_without_receivers_is_disconnected() {
        let (tx, rx) = bounded(3);
        drop(rx);
        assert_eq!(tx.send(1), Err(SendError::Disconnected(1)));
    }

    #[test]
    fn test_receiver_drop_wakes_blocked_sender() {
        let (tx, rx) = unbuffered();
        let producer = thread::spawn(move || tx.send(5));
        thread::sleep(Duration::from_millis(30));
        drop(rx);
        assert_eq!(producer.join().unwrap(), Err(SendError::Disconnected(5)));
    }

    #[test]
    fn test_try_recv_states() {
        let (tx, rx) = bounded(1);
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        tx.send(9).unwrap();
        assert_eq!(rx.try_recv(), Ok(9));
        drop(tx);
        assert_eq!(rx.try_recv(), Err(TryRecvError::Closed));
    }

    #[test]
    fn test_recv_timeout() {
        let (tx, rx) = bounded::<i32>(1);
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Timeout)
        );
        tx.close().unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Closed)
        );
    }

    #[test]
    fn test_multiple_receivers_share_values() {
        let (tx, rx) = bounded(8);
        let rx2 = rx.clone();
        let consumer = thread::spawn(move || rx2.iter().count());
        let mine = thread::spawn(move || rx.iter().count());
        for i in 0..100 {
            tx.send(i).unwrap();
        }
        drop(tx);
        assert_eq!(consumer.join().unwrap() + mine.join().unwrap(), 100);
    }

    #[test]
    fn test_done_signal_explicit() {
        let (done, rx) = done_signal();
        thread::spawn(move || done.signal());
        assert_eq!(rx.recv(), Ok(true));
        assert_eq!(rx.recv(), Err(RecvError));
    }

    #[test]
    fn test_done_signal_on_early_error_return() {
        fn task(done: DoneGuard, fail: bool) -> Result<(), String> {
            let _done = done;
            if fail {
                return Err("failed partway".into());
            }
            Ok(())
        }

        let (done, rx) = done_signal();
        let handle = thread::spawn(move || task(done, true));
        assert_eq!(rx.recv(), Ok(true));
        assert!(handle.join().unwrap().is_err());
    }

    #[test]
    fn test_done_signal_on_panic() {
        let (done, rx) = done_signal();
        let handle = thread::spawn(move || {
            let _done = done;
            panic!("task fails partway");
        });
        assert_eq!(rx.recv(), Ok(true));
        assert!(handle.join().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        // K values sent then closed are received exactly, in order, whether
        // K fits in the buffer or not.
        #[test]
        fn test_bounded_delivers_in_send_order(capacity in 0usize..8, count in 0usize..64) {
            let (tx, rx) = bounded(capacity);
            let producer = thread::spawn(move || {
                for i in 0..count {
                    tx.send(i).unwrap();
                }
                tx.close().unwrap();
            });

            let received: Vec<usize> = rx.iter().collect();
            producer.join().unwrap();
            prop_assert_eq!(received, (0..count).collect::<Vec<_>>());
        }
    }
}
