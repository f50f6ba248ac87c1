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

use std::path::Path;
use std::time::Duration;

/// Extracts a displayable file name from a path, returning a fallback if the name is unreadable.
pub fn filename_display(path: &Path) -> &str {
    path.file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unreadable file name")
}

/// The file name without its extension, used as the display name of imported samples.
pub fn sample_display_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|f| f.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("Untitled")
        .to_string()
}

/// Outputs the given duration in a seconds.milliseconds format, switching to minutes:seconds
/// once the duration reaches a minute.
pub fn duration_display(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        let minutes = secs / 60;
        return format!("{}:{:02}", minutes, secs - minutes * 60);
    }
    format!("{}.{:03}s", secs, duration.subsec_millis())
}

#[cfg(test)]
mod test {
    use std::path::Path;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_duration_strings() {
        assert_eq!("0.000s", duration_display(Duration::new(0, 0)));
        assert_eq!("0.250s", duration_display(Duration::from_millis(250)));
        assert_eq!("5.000s", duration_display(Duration::new(5, 0)));
        assert_eq!("1:00", duration_display(Duration::new(60, 0)));
        assert_eq!("2:05", duration_display(Duration::new(125, 0)));
    }

    #[test]
    fn test_display_names() {
        assert_eq!("Kick 01", sample_display_name(Path::new("/tmp/Kick 01.wav")));
        assert_eq!("snare", sample_display_name(Path::new("snare")));
        assert_eq!("Untitled", sample_display_name(Path::new("/")));
        assert_eq!("hat.aif", filename_display(Path::new("/a/b/hat.aif")));
    }
}
