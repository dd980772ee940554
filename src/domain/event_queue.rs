//! Ordered, single-consumer event channel.
//!
//! The driver owns the [`EventQueue`] and is the only reader. Producers hold
//! [`EventSender`] handles, which can only enqueue. Events come out strictly in
//! the order they were sent.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use super::event::Event;

type Buffer = RefCell<VecDeque<Event>>;

/// Enqueue-only handle onto the event channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    buffer: Weak<Buffer>,
}

/// Dequeue-only end of the event channel.
#[derive(Debug, Default)]
pub struct EventQueue {
    buffer: Rc<Buffer>,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue {
            buffer: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    /// A new producer handle onto this queue.
    pub fn sender(&self) -> EventSender {
        EventSender {
            buffer: Rc::downgrade(&self.buffer),
        }
    }

    /// Next queued event, or `None` when the queue is empty. Never blocks.
    pub fn try_next(&self) -> Option<Event> {
        self.buffer.borrow_mut().pop_front()
    }

    pub fn push(&self, event: Event) {
        self.buffer.borrow_mut().push_back(event);
    }
}

impl EventSender {
    /// Append an event to the back of the queue. Events sent after the queue
    /// has been dropped are discarded.
    pub fn send(&self, event: Event) {
        if let Some(buffer) = self.buffer.upgrade() {
            buffer.borrow_mut().push_back(event);
        }
    }
}
