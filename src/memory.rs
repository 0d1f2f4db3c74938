//! Process-wide conversation memory.
//!
//! A fixed-capacity FIFO of chat messages shared by every request. Appends
//! from concurrent requests may interleave; the capacity bound silently
//! evicts the oldest entries first.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::providers::ChatMessage;

pub type SharedMemory = Arc<Mutex<RollingBuffer>>;

#[derive(Debug)]
pub struct RollingBuffer {
    buf: VecDeque<ChatMessage>,
    capacity: usize,
}

impl RollingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn shared(capacity: usize) -> SharedMemory {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    pub fn push(&mut self, message: ChatMessage) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        for message in messages {
            self.push(message);
        }
    }

    /// Chronological copy of the current contents.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.buf.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
