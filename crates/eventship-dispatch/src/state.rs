//! Dispatch state: `sending` × `cooling down` as one four-state enum.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    #[default]
    Idle,
    /// A batch is out (or waiting on its retry); no cooldown running.
    Sending,
    /// No batch out; the debounce window is still open.
    CoolingDown,
    SendingCoolingDown,
}

impl DispatchState {
    pub fn is_sending(self) -> bool {
        matches!(self, DispatchState::Sending | DispatchState::SendingCoolingDown)
    }

    pub fn is_cooling_down(self) -> bool {
        matches!(
            self,
            DispatchState::CoolingDown | DispatchState::SendingCoolingDown
        )
    }

    /// A fresh (non-retry) send may start only from `Idle`.
    pub fn can_send(self) -> bool {
        self == DispatchState::Idle
    }

    /// A batch went out.
    pub fn send_started(self) -> Self {
        match self {
            DispatchState::Idle | DispatchState::Sending => DispatchState::Sending,
            DispatchState::CoolingDown | DispatchState::SendingCoolingDown => {
                DispatchState::SendingCoolingDown
            }
        }
    }

    /// The collector acknowledged the batch.
    pub fn send_succeeded(self) -> Self {
        match self {
            DispatchState::Idle | DispatchState::Sending => DispatchState::Idle,
            DispatchState::CoolingDown | DispatchState::SendingCoolingDown => {
                DispatchState::CoolingDown
            }
        }
    }

    /// A cooldown window opened.
    pub fn cooldown_started(self) -> Self {
        match self {
            DispatchState::Idle | DispatchState::CoolingDown => DispatchState::CoolingDown,
            DispatchState::Sending | DispatchState::SendingCoolingDown => {
                DispatchState::SendingCoolingDown
            }
        }
    }

    /// The cooldown window closed.
    pub fn cooldown_expired(self) -> Self {
        match self {
            DispatchState::Idle | DispatchState::CoolingDown => DispatchState::Idle,
            DispatchState::Sending | DispatchState::SendingCoolingDown => DispatchState::Sending,
        }
    }
}

impl std::fmt::Display for DispatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchState::Idle => write!(f, "idle"),
            DispatchState::Sending => write!(f, "sending"),
            DispatchState::CoolingDown => write!(f, "cooling_down"),
            DispatchState::SendingCoolingDown => write!(f, "sending+cooling_down"),
        }
    }
}
