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
use std::error::Error;
use std::f32::consts::PI;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use beatpad::audio::mock;
use beatpad::config;
use beatpad::import::NoProgress;
use beatpad::library::ImportOutcome;
use beatpad::playsync::CancelHandle;
use beatpad::samples::PlaybackMode;
use beatpad::session::Session;

/// Writes a 16-bit interleaved WAV of a sine at `amplitude` on every channel.
fn write_tone(
    path: &Path,
    channels: u16,
    sample_rate: u32,
    frames: usize,
    amplitude: f32,
) -> Result<(), Box<dyn Error>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for frame in 0..frames {
        let value = (2.0 * PI * 220.0 * frame as f32 / sample_rate as f32).sin() * amplitude;
        for _ in 0..channels {
            writer.write_sample((value * i16::MAX as f32).round() as i16)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

fn open_session(root: &Path) -> Result<(Session, mock::Device), Box<dyn Error>> {
    let device = mock::Device::get("mock-integration");
    let config = config::Beatpad::with_storage_root(root)
        .with_audio(config::Audio::new("mock-integration"));
    let session = Session::with_device(&config, Arc::new(device.clone()))?;
    Ok((session, device))
}

#[test]
fn imported_samples_play_with_choke_and_gate() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let (session, device) = open_session(&dir.path().join("root"))?;

    let kick = dir.path().join("Kick.wav");
    write_tone(&kick, 2, 44100, 88200, 0.5)?;
    let hat = dir.path().join("Hat.wav");
    write_tone(&hat, 1, 48000, 48000, 0.25)?;

    let outcomes = session.library().import_files(
        &[kick, hat],
        None,
        &NoProgress,
        &CancelHandle::new(),
    );
    let ids: Vec<String> = outcomes
        .into_iter()
        .map(|outcome| outcome.map(|outcome| outcome.asset().id.clone()))
        .collect::<Result<_, _>>()?;

    let kick = session.library().index().sample(&ids[0]).expect("kick");
    assert_eq!(48000, kick.sample_rate);
    assert_eq!(1, kick.channels);
    assert!((kick.duration_seconds - 2.0).abs() < 1e-3);

    session.assign_sample(0, &ids[0])?;
    session.assign_sample(1, &ids[1])?;
    let engine = session.engine();
    engine.update_pad_config(0, PlaybackMode::OneShot, 1, 1.0, 0)?;
    engine.update_pad_config(1, PlaybackMode::Gate, 1, 1.0, 0)?;
    engine.start()?;

    engine.trigger(0, true)?;
    let block = device.render(128);
    assert!(block.iter().any(|s| s.abs() > 0.0));
    assert!(engine.is_playing(0));

    engine.trigger(1, true)?;
    device.render(128);
    assert!(!engine.is_playing(0));
    assert!(engine.is_playing(1));

    engine.trigger(1, false)?;
    device.render(128);
    assert!(!engine.is_playing(1));

    engine.trigger(0, false)?;
    let block = device.render(128);
    assert!(!engine.is_playing(0));
    assert!(block.iter().all(|s| *s == 0.0));

    session.close();
    assert!(!device.is_open());
    Ok(())
}

#[test]
fn duplicate_imports_share_storage() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let (session, _device) = open_session(&dir.path().join("root"))?;
    let source = dir.path().join("Snare.wav");
    write_tone(&source, 1, 22050, 11025, 0.8)?;

    let cancel = CancelHandle::new();
    let first = session
        .library()
        .import_file(&source, None, &NoProgress, &cancel)?;
    let second = session
        .library()
        .import_file(&source, None, &NoProgress, &cancel)?;

    let index = session.library().index();
    match second {
        ImportOutcome::Duplicate { asset, original } => {
            assert_eq!(first.asset().id, original);
            assert_eq!(first.asset().path, asset.path);
        }
        other => panic!("expected a duplicate, got {:?}", other),
    }
    assert_eq!(
        Some(first.asset().id.clone()),
        index
            .find_by_content_hash(&first.asset().content_hash)
            .map(|sample| sample.id)
    );
    let stored = fs::read_dir(session.library().paths().samples_dir())?.count();
    assert_eq!(1, stored);
    assert_eq!(2, index.all_samples().len());
    Ok(())
}

#[test]
fn pads_come_back_after_restart() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("root");
    let source = dir.path().join("Clap.wav");
    write_tone(&source, 1, 48000, 4800, 0.5)?;

    {
        let (session, _device) = open_session(&root)?;
        let outcome =
            session
                .library()
                .import_file(&source, None, &NoProgress, &CancelHandle::new())?;
        session.assign_sample(5, &outcome.asset().id)?;
        session.close();
    }

    let (session, device) = open_session(&root)?;
    assert_eq!(1, session.restore_pads());
    session.engine().start()?;
    session.engine().trigger(5, true)?;
    assert!(device.render(64).iter().any(|s| s.abs() > 0.0));
    Ok(())
}
