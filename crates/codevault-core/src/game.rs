//! Global game flags
//!
//! `started` gates gameplay (teams wait in the lobby until an admin starts);
//! `event_active` closes the whole event (no logins, no submissions).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameFlags {
    pub started: bool,
    pub event_active: bool,
}

impl Default for GameFlags {
    fn default() -> Self {
        Self {
            started: false,
            event_active: true,
        }
    }
}

impl GameFlags {
    pub fn start(&mut self) {
        self.started = true;
    }

    /// Close the event. Teams can no longer log in or submit.
    pub fn end(&mut self) {
        self.event_active = false;
    }

    /// Back to the lobby with the event open.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn open_event(&mut self) {
        self.event_active = true;
    }

    pub fn accepts_submissions(&self) -> bool {
        self.started && self.event_active
    }

    pub fn ensure_event_open(&self) -> Result<()> {
        if self.event_active {
            Ok(())
        } else {
            Err(Error::EventClosed)
        }
    }

    pub fn ensure_accepting(&self) -> Result<()> {
        self.ensure_event_open()?;
        if self.started {
            Ok(())
        } else {
            Err(Error::GameNotActive)
        }
    }
}
