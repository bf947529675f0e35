// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Interactive hotkey capture
//!
//! A two-state machine that waits for one key combination and binds it
//! to the action being rebound:
//!
//! ```text
//!          start_capture(a)                 key (bare modifier)
//!   Idle ──────────────────▶ Capturing(a) ◀─────────────┐
//!    ▲                          │  │                     │
//!    │        cancel()          │  └─────────────────────┘
//!    ├──────────────────────────┤
//!    │   key (real combination) │
//!    └──── bind(a, combo) ◀─────┘
//! ```
//!
//! The action is always passed explicitly; the machine never infers it.
//! Starting a new capture while one is open silently drops the old one
//! without binding anything.

use tracing::debug;

use crate::core::hotkey::{HotkeyAction, KeyCombo, KeyEvent};
use crate::error::PrefsError;

/// Receives a captured combination for an action.
///
/// `PreferenceStore` implements this by writing the action's hotkey path.
pub trait BindingSink {
    fn bind(&mut self, action: HotkeyAction, combo: &KeyCombo) -> Result<(), PrefsError>;
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing(HotkeyAction),
}

/// Result of delivering a key event to the machine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CaptureOutcome {
    /// No capture was open; the event is the host's to handle
    NotCapturing,
    /// Bare modifier pressed; still waiting for a real key
    AwaitingKey(HotkeyAction),
    /// Combination bound and the session closed
    Bound {
        action: HotkeyAction,
        combo: KeyCombo,
    },
}

#[derive(Debug, Default)]
pub struct HotkeyCaptureMachine {
    state: CaptureState,
}

impl HotkeyCaptureMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, CaptureState::Capturing(_))
    }

    /// Opens a capture session for `action`.
    ///
    /// Returns the action whose open session was dropped, if any.
    pub fn start_capture(&mut self, action: HotkeyAction) -> Option<HotkeyAction> {
        let dropped = self.take_session();
        if let Some(previous) = dropped {
            debug!(%previous, %action, "capture replaced by a new session");
        }
        self.state = CaptureState::Capturing(action);
        debug!(%action, "capture started");
        dropped
    }

    /// Closes any open session without binding. Returns the dropped action.
    pub fn cancel(&mut self) -> Option<HotkeyAction> {
        let dropped = self.take_session();
        if let Some(action) = dropped {
            debug!(%action, "capture cancelled");
        }
        dropped
    }

    /// Delivers a key event.
    ///
    /// Bare modifiers keep the session open. Any other key is turned into
    /// a canonical combination and handed to `sink`; on success the session
    /// closes. If `sink` refuses the binding the session stays open and the
    /// error is returned, so the user can try another combination.
    pub fn handle_key<S: BindingSink + ?Sized>(
        &mut self,
        sink: &mut S,
        event: &KeyEvent,
    ) -> Result<CaptureOutcome, PrefsError> {
        let action = match self.state {
            CaptureState::Idle => return Ok(CaptureOutcome::NotCapturing),
            CaptureState::Capturing(action) => action,
        };

        if event.is_bare_modifier() {
            return Ok(CaptureOutcome::AwaitingKey(action));
        }

        let combo = KeyCombo::from_event(event).map_err(|source| PrefsError::InvalidHotkey {
            path: action.path().to_string(),
            source,
        })?;

        sink.bind(action, &combo)?;

        self.state = CaptureState::Idle;
        debug!(%action, %combo, "capture bound");
        Ok(CaptureOutcome::Bound { action, combo })
    }

    fn take_session(&mut self) -> Option<HotkeyAction> {
        match std::mem::take(&mut self.state) {
            CaptureState::Idle => None,
            CaptureState::Capturing(action) => Some(action),
        }
    }
}
