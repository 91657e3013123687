use std::sync::atomic::{AtomicBool, Ordering};

/// A single-slot mailbox for deferred capture requests.
///
/// Producers (timers, signal handlers, allocation hooks) post; the safe point drains.
/// At most one request can be pending at a time.
#[derive(Debug, Default)]
pub struct Mailbox {
    pending: AtomicBool,
}

#[derive(Debug, PartialEq)]
pub enum MailboxError {
    Occupied,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    // async-signal-safe
    pub fn post(&self) -> Result<(), MailboxError> {
        if self.pending.swap(true, Ordering::AcqRel) {
            return Err(MailboxError::Occupied);
        }
        Ok(())
    }

    /// Takes the pending request, if any.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        self.pending.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailbox() {
        let mailbox = Mailbox::new();
        assert!(!mailbox.take());

        mailbox.post().unwrap();
        assert!(mailbox.is_pending());
        assert!(mailbox.take());
        assert!(!mailbox.take());
    }

    #[test]
    fn test_mailbox_occupied() {
        let mailbox = Mailbox::new();
        mailbox.post().unwrap();
        assert_eq!(mailbox.post(), Err(MailboxError::Occupied));
        assert!(mailbox.take());
        assert_eq!(mailbox.post(), Ok(()));
    }

    #[test]
    fn test_mailbox_post_a_lot() {
        let mailbox = Mailbox::new();
        let mut accepted = 0;
        for i in 0..100 {
            if mailbox.post().is_ok() {
                accepted += 1;
            }
            // Drain on every other post; the rest collide with the pending one
            if i % 2 == 1 {
                assert!(mailbox.take());
            }
        }
        assert_eq!(accepted, 50);
        mailbox.clear();
        assert!(!mailbox.is_pending());
    }
}
