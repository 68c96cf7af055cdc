use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

/// Bounded FIFO shared between one or more producers and a set of consumers.
///
/// Capacity counts both pending items and items claimed by [`pop`](Self::pop) but not yet
/// released with [`complete`](Self::complete). Producers block while that sum is at capacity;
/// consumers block while nothing is pending. Nothing polls.
#[derive(Debug)]
pub(crate) struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    idle: Condvar,
    capacity: usize,
}

#[derive(Debug)]
struct QueueState<T> {
    pending: VecDeque<T>,
    in_flight: usize,
    closed: bool,
}

impl<T> QueueState<T> {
    fn occupied(&self) -> usize {
        self.pending.len() + self.in_flight
    }
}

impl<T> BoundedQueue<T> {
    /// `capacity` must be at least 1.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::with_capacity(capacity),
                in_flight: 0,
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            idle: Condvar::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `item`, blocking while the queue is full. Hands the item back once closed.
    pub(crate) fn push(&self, item: T) -> Result<(), T> {
        let mut st = self.lock();
        while !st.closed && st.occupied() >= self.capacity {
            st = self.not_full.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
        if st.closed {
            return Err(item);
        }
        st.pending.push_back(item);
        drop(st);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Claim the oldest item, blocking while none is pending.
    ///
    /// Returns `None` only when the queue is closed and fully drained. Every claimed item must be
    /// released with [`complete`](Self::complete).
    pub(crate) fn pop(&self) -> Option<T> {
        let mut st = self.lock();
        loop {
            if let Some(item) = st.pending.pop_front() {
                st.in_flight += 1;
                return Some(item);
            }
            if st.closed {
                return None;
            }
            st = self.not_empty.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Release one claimed item, freeing its slot.
    pub(crate) fn complete(&self) {
        let mut st = self.lock();
        st.in_flight = st.in_flight.saturating_sub(1);
        let idle = st.occupied() == 0;
        drop(st);
        self.not_full.notify_one();
        if idle {
            self.idle.notify_all();
        }
    }

    /// Refuse further pushes and wake every waiter. Pending items can still be popped.
    pub(crate) fn close(&self) {
        self.lock().closed = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Block until nothing is pending or in flight.
    pub(crate) fn wait_idle(&self) {
        let mut st = self.lock();
        while st.occupied() > 0 {
            st = self.idle.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.lock().in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{Arc, mpsc},
        thread,
        time::Duration,
    };

    const BLOCKED: Duration = Duration::from_millis(150);
    const WAKE: Duration = Duration::from_secs(5);

    #[test]
    fn pops_in_fifo_order() {
        let q = BoundedQueue::new(3);
        for i in 0..3 {
            q.push(i).unwrap();
        }
        assert_eq!(q.pop(), Some(0));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.in_flight(), 3);
    }

    #[test]
    fn push_blocks_until_a_claimed_item_completes() {
        let q = Arc::new(BoundedQueue::new(1));
        q.push(1).unwrap();
        assert_eq!(q.pop(), Some(1));

        let (tx, rx) = mpsc::channel();
        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                q.push(2).unwrap();
                tx.send(()).unwrap();
            })
        };

        assert!(rx.recv_timeout(BLOCKED).is_err(), "in-flight item holds the slot");
        q.complete();
        rx.recv_timeout(WAKE).unwrap();
        producer.join().unwrap();
        assert_eq!(q.pending(), 1);
    }

    #[test]
    fn close_wakes_blocked_consumers_and_producers() {
        let q = Arc::new(BoundedQueue::<u32>::new(1));
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.pop())
        };
        thread::sleep(Duration::from_millis(20));
        q.close();
        assert_eq!(consumer.join().unwrap(), None);
        assert_eq!(q.push(7), Err(7));
        assert!(q.is_closed());
    }

    #[test]
    fn closed_queue_still_drains_pending_items() {
        let q = BoundedQueue::new(2);
        q.push("a").unwrap();
        q.push("b").unwrap();
        q.close();
        assert_eq!(q.pop(), Some("a"));
        assert_eq!(q.pop(), Some("b"));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn wait_idle_returns_after_last_completion() {
        let q = Arc::new(BoundedQueue::new(2));
        q.push(1).unwrap();
        let worker = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                let item = q.pop();
                thread::sleep(Duration::from_millis(20));
                q.complete();
                item
            })
        };
        q.wait_idle();
        assert_eq!(q.pending() + q.in_flight(), 0);
        assert_eq!(worker.join().unwrap(), Some(1));
    }
}
