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
//

/// Errors raised while finding or opening an output device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("no output device found with name {0}")]
    NotFound(String),

    #[error("unable to query audio devices: {0}")]
    Query(String),

    #[error("unsupported stream configuration: {0}")]
    StreamConfig(String),

    #[error("failed to build output stream: {0}")]
    StreamBuild(String),

    #[error("failed to start output stream: {0}")]
    StreamPlay(String),

    #[error("output thread exited before the stream started")]
    ThreadExited,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
