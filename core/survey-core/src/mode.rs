//! Activity mode derivation.
//!
//! The mode is a pure function of a few session facts plus the latest
//! telemetry snapshot. Keeping it pure lets the engine re-derive after every
//! input and compare against the previous value to detect real transitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::telemetry::{GuiFocus, Status, StatusFlags, StatusFlags2, Vehicle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "focus")]
pub enum Mode {
    Offline,
    MainMenu,
    CarrierManagement,
    /// A game panel or map has focus.
    Panel(GuiFocus),
    Jumping,
    InFighter,
    InSrv,
    InTaxi,
    OnFoot,
    SuperCruising,
    GlideMode,
    Landed,
    Docked,
    SocialSpace,
    Flying,
    Unknown,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Panel(focus) => write!(f, "Panel({:?})", focus),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Everything [`derive_mode`] looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeInputs<'a> {
    pub process_running: bool,
    pub shutdown: bool,
    pub at_main_menu: bool,
    pub at_carrier_management: bool,
    pub identity_known: bool,
    pub jumping: bool,
    pub status: Option<&'a Status>,
}

pub fn derive_mode(inputs: &ModeInputs<'_>) -> Mode {
    if !inputs.process_running || inputs.shutdown {
        return Mode::Offline;
    }
    if inputs.at_main_menu || !inputs.identity_known {
        return Mode::MainMenu;
    }
    if inputs.at_carrier_management {
        return Mode::CarrierManagement;
    }

    let focus = inputs
        .status
        .map(|status| status.gui_focus)
        .unwrap_or_default();
    if focus != GuiFocus::NoFocus {
        return Mode::Panel(focus);
    }

    if inputs.jumping {
        return Mode::Jumping;
    }

    let Some(status) = inputs.status else {
        debug!("No telemetry yet; mode unknown");
        return Mode::Unknown;
    };

    let vehicle = status.vehicle();
    match vehicle {
        Vehicle::Fighter => return Mode::InFighter,
        Vehicle::Srv => return Mode::InSrv,
        Vehicle::Taxi => return Mode::InTaxi,
        _ => {}
    }
    if status.flags2.has(StatusFlags2::ON_FOOT_EXTERIOR) {
        return Mode::OnFoot;
    }

    if status.flags.has(StatusFlags::SUPERCRUISE) {
        return Mode::SuperCruising;
    }
    if status.flags2.has(StatusFlags2::GLIDE_MODE) {
        return Mode::GlideMode;
    }
    if status.flags.has(StatusFlags::LANDED) {
        return Mode::Landed;
    }

    if status.flags.has(StatusFlags::DOCKED) || status.flags2.has(StatusFlags2::ON_FOOT_IN_STATION) {
        return Mode::Docked;
    }
    if status.flags2.has(StatusFlags2::ON_FOOT_SOCIAL_SPACE) {
        return Mode::SocialSpace;
    }

    if vehicle == Vehicle::MainShip {
        return Mode::Flying;
    }

    warn!(
        flags = status.flags.0,
        flags2 = status.flags2.0,
        "Unhandled telemetry flag combination"
    );
    Mode::Unknown
}
