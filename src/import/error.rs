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

/// Why an import failed. Every failure leaves the destination untouched.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unable to decode source audio: {0}")]
    DecodeFailed(String),

    #[error("unable to set up sample rate conversion: {0}")]
    ConverterInitFailed(String),

    #[error("unable to allocate buffer for {0} frames")]
    BufferAllocFailed(usize),

    #[error("resampling failed: {0}")]
    ResampleFailed(String),

    #[error("unable to write output: {0}")]
    WriteFailed(String),

    #[error("import cancelled")]
    Cancelled,
}
