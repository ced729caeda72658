//! The one place a user-facing error is displayed from.
//!
//! [`ErrorChannel`] is a cloneable handle over a `watch` channel. The query
//! cache writes to it; a single UI surface subscribes and renders
//! [`ErrorChannel::presentation`].

use std::sync::Arc;

use tokio::sync::watch;

use crate::messages::{SPECIAL_ERROR_1, SPECIAL_ERROR_2};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorState {
    pub is_visible: bool,
    pub status_code: Option<u16>,
    pub message: String,
}

/// What the error surface should render for the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    Hidden,
    /// Recorded but rendered by a dedicated flow, not the generic modal.
    Suppressed(u16),
    Modal {
        status_code: Option<u16>,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct ErrorChannel {
    state: Arc<watch::Sender<ErrorState>>,
    suppressed: Vec<u16>,
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorChannel {
    pub fn new() -> Self {
        Self::with_suppressed([SPECIAL_ERROR_1, SPECIAL_ERROR_2])
    }

    pub fn with_suppressed(codes: impl IntoIterator<Item = u16>) -> Self {
        let (state, _) = watch::channel(ErrorState::default());
        Self {
            state: Arc::new(state),
            suppressed: codes.into_iter().collect(),
        }
    }

    pub fn show_error(&self, status_code: Option<u16>, message: impl Into<String>) {
        let next = ErrorState {
            is_visible: true,
            status_code,
            message: message.into(),
        };
        self.state.send_replace(next);
    }

    pub fn hide_error(&self) {
        self.state.send_replace(ErrorState::default());
    }

    pub fn state(&self) -> ErrorState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ErrorState> {
        self.state.subscribe()
    }

    pub fn presentation(&self) -> Presentation {
        let state = self.state.borrow();
        if !state.is_visible {
            return Presentation::Hidden;
        }
        match state.status_code {
            Some(code) if self.suppressed.contains(&code) => Presentation::Suppressed(code),
            status_code => Presentation::Modal {
                status_code,
                message: state.message.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_hidden() {
        let channel = ErrorChannel::new();
        assert_eq!(channel.state(), ErrorState::default());
        assert_eq!(channel.presentation(), Presentation::Hidden);
    }

    #[test]
    fn show_then_hide() {
        let channel = ErrorChannel::new();
        channel.show_error(Some(404), "not found");
        assert_eq!(
            channel.state(),
            ErrorState {
                is_visible: true,
                status_code: Some(404),
                message: "not found".to_string(),
            }
        );
        assert_eq!(
            channel.presentation(),
            Presentation::Modal {
                status_code: Some(404),
                message: "not found".to_string(),
            }
        );

        channel.hide_error();
        assert_eq!(channel.presentation(), Presentation::Hidden);
    }

    #[test]
    fn sentinel_codes_are_recorded_but_suppressed() {
        let channel = ErrorChannel::new();
        channel.show_error(Some(599), "special");
        assert!(channel.state().is_visible);
        assert_eq!(channel.presentation(), Presentation::Suppressed(599));
    }

    #[test]
    fn clones_share_state() {
        let channel = ErrorChannel::new();
        let other = channel.clone();
        other.show_error(None, "offline");
        assert_eq!(channel.state().status_code, None);
        assert!(channel.state().is_visible);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let channel = ErrorChannel::new();
        let mut rx = channel.subscribe();
        channel.show_error(Some(500), "internal server error");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().status_code, Some(500));
    }
}
