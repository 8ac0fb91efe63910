//! Radios heard through adapter voices.

use earshot_audio::{
    HeadlessBackend, PlaybackBackend, Playlist, Radio, RadioStations, VirtualAudio, VirtualVoice,
    VoiceState,
};
use earshot_core::{Pose, VirtualAudioConfig};
use glam::Vec3;

const DT: f32 = 1.0 / 60.0;

#[test]
fn adapter_follows_radio_through_song_changes() {
    let mut audio = VirtualAudio::new(HeadlessBackend::new(), VirtualAudioConfig::default());
    let songs = vec![audio.backend_mut().add_clip(1.0), audio.backend_mut().add_clip(1.5)];
    audio.register_listener(Pose::from_position(Vec3::ZERO));

    let mut stations = RadioStations::with_seed(5);
    let handle = audio.backend_mut().create_handle().unwrap();
    let mut radio = Radio::new(handle, Playlist::new(1, songs));
    let mut voice = VirtualVoice::adapter(handle)
        .with_pose(Pose::from_position(Vec3::new(2.0, 0.0, 0.0)));

    radio.play(&mut stations, &mut audio).unwrap();
    for _ in 0..300 {
        audio.advance(DT);
        radio.tick(&mut stations, &mut audio).unwrap();
        assert_eq!(voice.tick(&mut audio).unwrap(), VoiceState::Active);

        let proxy = voice
            .proxy()
            .and_then(|lease| audio.existing_manager()?.pool.handle(lease))
            .unwrap();
        let backend = audio.backend();
        let state = backend.handle(proxy).unwrap();
        assert_eq!(state.clip, backend.clip(handle));
        assert!(state.playing);
        assert!(backend.is_muted(handle));
        assert!((state.time - backend.time(handle)).abs() <= 0.1);
    }

    radio.stop(&mut stations, &mut audio);
    audio.advance(DT);
    assert_eq!(voice.tick(&mut audio).unwrap(), VoiceState::Idle);
    assert!(stations.is_empty());
}

#[test]
fn late_radio_joins_station_mid_song() {
    let mut audio = VirtualAudio::new(HeadlessBackend::new(), VirtualAudioConfig::default());
    let song = audio.backend_mut().add_clip(60.0);
    let playlist = Playlist::new(3, vec![song]);
    let mut stations = RadioStations::with_seed(11);

    let kitchen = audio.backend_mut().create_handle().unwrap();
    let mut kitchen_radio = Radio::new(kitchen, playlist.clone());
    kitchen_radio.play(&mut stations, &mut audio).unwrap();

    for _ in 0..120 {
        audio.advance(DT);
        kitchen_radio.tick(&mut stations, &mut audio).unwrap();
    }

    let garage = audio.backend_mut().create_handle().unwrap();
    let mut garage_radio = Radio::new(garage, playlist);
    garage_radio.play(&mut stations, &mut audio).unwrap();
    assert_eq!(stations.subscribers(3), 2);

    let backend = audio.backend();
    assert!((backend.time(garage) - 2.0).abs() < 0.05);
    assert!((backend.time(garage) - backend.time(kitchen)).abs() < 1e-3);

    // The station stays on air while one radio still plays.
    kitchen_radio.stop(&mut stations, &mut audio);
    assert_eq!(stations.subscribers(3), 1);
    assert!(audio.backend().is_playing(garage));
}
