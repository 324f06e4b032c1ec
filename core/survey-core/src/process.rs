//! Game process liveness.

use std::sync::Mutex;
use sysinfo::{ProcessRefreshKind, System};

/// Answers "is the game running right now?".
pub trait ProcessProbe: Send + Sync {
    fn is_running(&self) -> bool;
}

/// Looks for a process whose name starts with the configured executable name
/// (so `EliteDangerous64` matches `EliteDangerous64.exe`).
pub struct SysinfoProbe {
    process_name: String,
    system: Mutex<System>,
}

impl SysinfoProbe {
    pub fn new(process_name: &str) -> Self {
        Self {
            process_name: process_name.to_lowercase(),
            system: Mutex::new(System::new()),
        }
    }
}

impl ProcessProbe for SysinfoProbe {
    fn is_running(&self) -> bool {
        let Ok(mut system) = self.system.lock() else {
            return false;
        };
        system.refresh_processes_specifics(ProcessRefreshKind::new());
        let running = system
            .processes()
            .values()
            .any(|process| process.name().to_lowercase().starts_with(&self.process_name));
        running
    }
}

/// Fixed answer; for tests and `status` snapshots where liveness is assumed.
pub struct StaticProbe(pub bool);

impl ProcessProbe for StaticProbe {
    fn is_running(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_process_is_not_running() {
        let probe = SysinfoProbe::new("definitely-not-a-real-process-name");
        assert!(!probe.is_running());
    }
}
