use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// FIFO handoff between the polling thread and any number of consumers.
///
/// Once closed, pushes are refused but consumers still drain what is queued.
#[derive(Debug)]
pub struct DeliveryQueue<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

/// Outcome of a timed receive.
#[derive(Debug, PartialEq, Eq)]
pub enum Recv<T> {
    Item(T),
    TimedOut,
    Closed,
}

impl<T> DeliveryQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    // Every critical section leaves the state consistent, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item and wake one waiter. Returns `false` once closed.
    pub fn push(&self, item: T) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.items.push_back(item);
        drop(state);
        self.ready.notify_one();
        true
    }

    /// Take the oldest item without waiting.
    pub fn try_recv(&self) -> Recv<T> {
        let mut state = self.lock();
        match state.items.pop_front() {
            Some(item) => Recv::Item(item),
            None if state.closed => Recv::Closed,
            None => Recv::TimedOut,
        }
    }

    /// Take the oldest item, waiting at most `timeout` for one to arrive.
    pub fn recv_timeout(&self, timeout: Duration) -> Recv<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Recv::Item(item);
            }
            if state.closed {
                return Recv::Closed;
            }
            let now = Instant::now();
            if now >= deadline {
                return Recv::TimedOut;
            }
            state = self
                .ready
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    /// Refuse further pushes and wake every waiter.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for DeliveryQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn fifo_order() {
        let queue = DeliveryQueue::new();
        for i in 0..5 {
            assert!(queue.push(i));
        }
        for i in 0..5 {
            assert_eq!(queue.try_recv(), Recv::Item(i));
        }
        assert_eq!(queue.try_recv(), Recv::TimedOut);
    }

    #[test]
    fn recv_timeout_expires() {
        let queue = DeliveryQueue::<u8>::new();
        let start = Instant::now();
        assert_eq!(queue.recv_timeout(Duration::from_millis(30)), Recv::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn recv_timeout_wakes_on_push() {
        let queue = Arc::new(DeliveryQueue::new());
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.push(42u32);
            })
        };

        assert_eq!(queue.recv_timeout(Duration::from_secs(5)), Recv::Item(42));
        producer.join().unwrap();
    }

    #[test]
    fn close_drains_then_reports_closed() {
        let queue = DeliveryQueue::new();
        queue.push("a");
        queue.close();

        assert!(!queue.push("b"));
        assert!(queue.is_closed());
        assert_eq!(queue.recv_timeout(Duration::from_secs(1)), Recv::Item("a"));
        assert_eq!(queue.recv_timeout(Duration::from_secs(1)), Recv::Closed);
        assert_eq!(queue.try_recv(), Recv::Closed);
    }

    #[test]
    fn close_wakes_blocked_consumers() {
        let queue = Arc::new(DeliveryQueue::<u8>::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.recv_timeout(Duration::from_secs(10)))
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        queue.close();

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), Recv::Closed);
        }
    }

    #[test]
    fn many_consumers_see_each_item_once() {
        let queue = Arc::new(DeliveryQueue::new());
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Recv::Item(item) = queue.recv_timeout(Duration::from_secs(5)) {
                        seen.push(item);
                    }
                    seen
                })
            })
            .collect();

        for i in 0..1000u32 {
            queue.push(i);
        }
        queue.close();

        let mut all = HashSet::new();
        let mut total = 0;
        for consumer in consumers {
            for item in consumer.join().unwrap() {
                all.insert(item);
                total += 1;
            }
        }
        assert_eq!(total, 1000);
        assert_eq!(all.len(), 1000);
        assert_eq!(queue.len(), 0);
    }
}
