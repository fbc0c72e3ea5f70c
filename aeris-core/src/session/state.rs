//! Session state machine
//!
//! Every change of connection state goes through [`SessionState::transition`].

/// Why a session failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailureKind {
    /// Socket, DNS or TLS error
    Transport,
    /// Broker refused CONNECT or answered out of protocol
    Handshake,
    /// Broker refused the subscription
    Subscribe,
    /// Stream broke while connected
    ConnectionLost,
}

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// No transport open
    #[default]
    Disconnected,
    /// Transport opening, handshake or subscription in flight
    Connecting,
    /// Subscribed; publish and poll allowed
    Connected,
    /// Transport released after an error; only Disconnect leaves this state
    Failed(FailureKind),
}

/// Session events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEvent {
    /// Caller asked for a session
    ConnectRequested,
    /// CONNACK accepted and SUBACK granted
    Established,
    /// Any error; the kind is recorded in the failed state
    Fault(FailureKind),
    /// Caller tore the session down
    Disconnect,
}

impl SessionState {
    /// Publish and poll are only valid here
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SessionState::Failed(_))
    }

    /// Process an event and return the next state
    pub fn transition(self, event: SessionEvent) -> Self {
        use SessionEvent::*;
        use SessionState::*;

        match (self, event) {
            (Disconnected, ConnectRequested) => Connecting,

            (Connecting, Established) => Connected,
            (Connecting, Fault(kind)) => Failed(kind),

            (Connected, Fault(kind)) => Failed(kind),

            // Disconnect resets from anywhere
            (_, Disconnect) => Disconnected,

            // Invalid transitions - stay in current state
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = SessionState::default();
        assert_eq!(state, SessionState::Disconnected);

        let state = state.transition(SessionEvent::ConnectRequested);
        assert_eq!(state, SessionState::Connecting);

        let state = state.transition(SessionEvent::Established);
        assert!(state.is_connected());

        let state = state.transition(SessionEvent::Disconnect);
        assert_eq!(state, SessionState::Disconnected);
    }

    #[test]
    fn test_faults_from_connecting_and_connected() {
        let state = SessionState::Connecting.transition(SessionEvent::Fault(FailureKind::Handshake));
        assert_eq!(state, SessionState::Failed(FailureKind::Handshake));

        let state =
            SessionState::Connected.transition(SessionEvent::Fault(FailureKind::ConnectionLost));
        assert_eq!(state, SessionState::Failed(FailureKind::ConnectionLost));
        assert!(state.is_failed());
    }

    #[test]
    fn test_failed_only_leaves_via_disconnect() {
        let failed = SessionState::Failed(FailureKind::Transport);
        assert_eq!(failed.transition(SessionEvent::ConnectRequested), failed);
        assert_eq!(failed.transition(SessionEvent::Established), failed);
        assert_eq!(
            failed.transition(SessionEvent::Disconnect),
            SessionState::Disconnected
        );
    }

    #[test]
    fn test_invalid_transitions_ignored() {
        assert_eq!(
            SessionState::Disconnected.transition(SessionEvent::Established),
            SessionState::Disconnected
        );
        assert_eq!(
            SessionState::Disconnected.transition(SessionEvent::Fault(FailureKind::Transport)),
            SessionState::Disconnected
        );
        assert_eq!(
            SessionState::Connected.transition(SessionEvent::ConnectRequested),
            SessionState::Connected
        );
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let state = SessionState::Disconnected.transition(SessionEvent::Disconnect);
        assert_eq!(state, SessionState::Disconnected);
    }
}
