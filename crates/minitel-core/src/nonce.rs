//! Nonce sequencing.
//!
//! Client and server share one counter and take turns advancing it by exactly
//! one per frame: the client sends `n`, the server must answer with `n + 1`,
//! the client's next frame carries `n + 2`, and so on. Any skip or repeat is a
//! protocol violation.
//!
//! Validation and recording are split so a bad frame can be rejected without
//! touching the counters. The connection is torn down afterwards anyway, but
//! the sequencer still shows exactly which value was expected.

/// Turn-taking counters for one connection.
///
/// Counters wrap at `u32::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NonceSequencer {
    /// Last nonce this side transmitted
    local_last_sent: Option<u32>,
    /// Nonce the next inbound frame must carry, or the last accepted one
    /// once [`NonceSequencer::record_remote`] ran
    remote_expected: Option<u32>,
    /// Whether any remote nonce was ever accepted
    remote_seen: bool,
}

impl NonceSequencer {
    /// Create a sequencer in the initial state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything. Called for every new connection.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Nonce for the next local frame.
    ///
    /// Zero until a remote nonce has been recorded, then one past it.
    pub fn next_local_nonce(&self) -> u32 {
        match self.remote_expected {
            Some(remote) if self.remote_seen => remote.wrapping_add(1),
            _ => 0,
        }
    }

    /// Note that `nonce` was sent; the peer must answer with `nonce + 1`.
    pub fn record_local_send(&mut self, nonce: u32) {
        self.local_last_sent = Some(nonce);
        self.remote_expected = Some(nonce.wrapping_add(1));
    }

    /// True iff `nonce` is the value the next inbound frame must carry.
    pub fn validate_remote(&self, nonce: u32) -> bool {
        self.remote_expected == Some(nonce)
    }

    /// Accept `nonce` from the peer so the next local nonce is `nonce + 1`.
    pub fn record_remote(&mut self, nonce: u32) {
        self.remote_expected = Some(nonce);
        self.remote_seen = true;
    }

    /// Last nonce sent, if any.
    pub fn local_last_sent(&self) -> Option<u32> {
        self.local_last_sent
    }

    /// Nonce the next inbound frame must carry, if a send happened.
    pub fn remote_expected(&self) -> Option<u32> {
        self.remote_expected
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn starts_at_zero() {
        let seq = NonceSequencer::new();
        assert_eq!(seq.next_local_nonce(), 0);
        assert_eq!(seq.local_last_sent(), None);
        assert_eq!(seq.remote_expected(), None);
        assert!(!seq.validate_remote(0));
    }

    #[test]
    fn nonce_law() {
        let mut seq = NonceSequencer::new();
        assert_eq!(seq.next_local_nonce(), 0);

        seq.record_remote(5);
        assert_eq!(seq.next_local_nonce(), 6);

        seq.record_local_send(6);
        assert_eq!(seq.remote_expected(), Some(7));
        assert!(seq.validate_remote(7));
        assert!(!seq.validate_remote(8));
    }

    #[test]
    fn local_send_alone_does_not_advance_next_nonce() {
        let mut seq = NonceSequencer::new();
        seq.record_local_send(0);
        assert_eq!(seq.next_local_nonce(), 0);
        assert_eq!(seq.remote_expected(), Some(1));
    }

    #[test]
    fn validation_does_not_mutate() {
        let mut seq = NonceSequencer::new();
        seq.record_local_send(0);
        let before = seq;

        assert!(!seq.validate_remote(2));
        assert!(seq.validate_remote(1));
        assert_eq!(seq, before);
    }

    #[test]
    fn reset_returns_to_sentinel() {
        let mut seq = NonceSequencer::new();
        seq.record_local_send(0);
        seq.record_remote(1);
        seq.reset();

        assert_eq!(seq, NonceSequencer::new());
        assert_eq!(seq.next_local_nonce(), 0);
    }

    #[test]
    fn wraps_at_max() {
        let mut seq = NonceSequencer::new();
        seq.record_local_send(u32::MAX);
        assert!(seq.validate_remote(0));
        seq.record_remote(u32::MAX);
        assert_eq!(seq.next_local_nonce(), 0);
    }

    proptest! {
        #[test]
        fn honest_exchange_alternates(rounds in 1usize..64) {
            let mut client = NonceSequencer::new();
            let mut server = NonceSequencer::new();

            for _ in 0..rounds {
                let sent = client.next_local_nonce();
                client.record_local_send(sent);

                // Server side mirrors the same law
                server.record_remote(sent);
                let reply = server.next_local_nonce();
                server.record_local_send(reply);

                prop_assert!(client.validate_remote(reply));
                client.record_remote(reply);
                prop_assert_eq!(reply, sent + 1);
            }

            prop_assert_eq!(client.next_local_nonce(), (rounds * 2) as u32);
        }

        #[test]
        fn only_successor_validates(sent in any::<u32>(), received in any::<u32>()) {
            let mut seq = NonceSequencer::new();
            seq.record_local_send(sent);
            prop_assert_eq!(seq.validate_remote(received), received == sent.wrapping_add(1));
        }
    }
}
