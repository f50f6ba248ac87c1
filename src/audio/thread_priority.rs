// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Scheduling for the output callback thread.

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};

const PRIORITY_VAR: &str = "BEATPAD_THREAD_PRIORITY";
const DISABLE_RT_VAR: &str = "BEATPAD_DISABLE_RT_AUDIO";

/// Used when BEATPAD_THREAD_PRIORITY is unset or out of range.
const DEFAULT_PRIORITY: u8 = 70;

/// How the callback thread should be scheduled, captured once when the stream is built so the
/// callback never touches the environment.
#[derive(Clone, Copy, Debug)]
pub struct CallbackPriority {
    level: u8,
    priority: Option<ThreadPriorityValue>,
    realtime: bool,
    applied: bool,
}

impl CallbackPriority {
    /// Reads BEATPAD_THREAD_PRIORITY (0-99) and BEATPAD_DISABLE_RT_AUDIO.
    pub fn from_env() -> CallbackPriority {
        let level = std::env::var(PRIORITY_VAR)
            .ok()
            .and_then(|v| v.trim().parse::<u8>().ok())
            .filter(|n| *n < 100)
            .unwrap_or(DEFAULT_PRIORITY);
        CallbackPriority {
            level,
            priority: ThreadPriorityValue::try_from(level).ok(),
            realtime: !env_flag(DISABLE_RT_VAR),
            applied: false,
        }
    }

    /// The requested level, if the platform accepts it.
    pub fn priority(&self) -> Option<u8> {
        self.priority.map(|_| self.level)
    }

    /// Whether SCHED_FIFO will be requested on unix.
    pub fn realtime(&self) -> bool {
        self.realtime
    }

    /// Raises the calling thread's priority the first time it's called. Failures are ignored; the
    /// callback keeps running at whatever priority it has.
    pub fn apply_once(&mut self) {
        if self.applied {
            return;
        }
        self.applied = true;
        let Some(priority) = self.priority else {
            return;
        };

        let priority = ThreadPriority::Crossplatform(priority);
        let _ = set_current_thread_priority(priority);

        #[cfg(unix)]
        if self.realtime {
            use thread_priority::unix::{
                set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
                ThreadSchedulePolicy,
            };
            let _ = set_thread_priority_and_policy(
                thread_native_id(),
                priority,
                ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
            );
        }
    }
}

/// True for 1, true, yes or on, in any case.
fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| {
        let v = v.trim();
        v == "1" || ["true", "yes", "on"].iter().any(|s| v.eq_ignore_ascii_case(s))
    })
}
