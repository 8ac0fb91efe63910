//! Radios: native handles streaming a playlist in sync with every other radio
//! tuned to the same playlist.
//!
//! A station goes live when its first radio starts playing and goes off air
//! when its last radio stops. While live it picks songs at random and keeps a
//! shared clock, so a radio switched on late joins the current song at the
//! current position. Pair a radio's handle with
//! [`VirtualVoice::adapter`](crate::VirtualVoice::adapter) to hear it through
//! the virtual listeners.

use earshot_core::{ClipId, Result};
use hashbrown::HashMap;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::backend::{NativeHandleId, PlaybackBackend};
use crate::context::VirtualAudio;

/// Songs a station picks from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Radios with the same playlist id share a station.
    pub id: u32,
    /// Songs allowed on air
    pub clips: Vec<ClipId>,
}

impl Playlist {
    /// Create a playlist.
    #[must_use]
    pub const fn new(id: u32, clips: Vec<ClipId>) -> Self {
        Self { id, clips }
    }
}

/// What a station is broadcasting right now.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiveClip {
    /// Song on air
    pub clip: ClipId,
    /// Position in the song, in seconds
    pub time: f32,
}

#[derive(Debug)]
struct Station {
    clips: Vec<ClipId>,
    subscribers: usize,
    current: ClipId,
    started_at: f64,
}

/// Live stations keyed by playlist id.
#[derive(Debug)]
pub struct RadioStations {
    stations: HashMap<u32, Station>,
    rng: SmallRng,
}

impl Default for RadioStations {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioStations {
    /// Create an empty set of stations with a randomly seeded song picker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stations: HashMap::new(),
            rng: SmallRng::from_entropy(),
        }
    }

    /// Create an empty set of stations with a fixed song order.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            stations: HashMap::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Number of stations on air.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Check if no station is on air.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Number of radios tuned to a playlist.
    #[must_use]
    pub fn subscribers(&self, playlist: u32) -> usize {
        self.stations.get(&playlist).map_or(0, |s| s.subscribers)
    }

    /// Tune one more radio to a playlist, putting its station on air if needed.
    ///
    /// Returns `false` for an empty playlist, which has nothing to broadcast.
    pub fn subscribe(&mut self, playlist: &Playlist, now: f64) -> bool {
        if let Some(station) = self.stations.get_mut(&playlist.id) {
            station.subscribers += 1;
            return true;
        }
        let Some(&current) = playlist.clips.choose(&mut self.rng) else {
            tracing::warn!(playlist = playlist.id, "Cannot broadcast an empty playlist");
            return false;
        };
        self.stations.insert(
            playlist.id,
            Station {
                clips: playlist.clips.clone(),
                subscribers: 1,
                current,
                started_at: now,
            },
        );
        tracing::debug!(playlist = playlist.id, ?current, "Station went live");
        true
    }

    /// Untune a radio. The station goes off air with its last radio.
    ///
    /// Returns `false` if the playlist was not on air.
    pub fn unsubscribe(&mut self, playlist: u32) -> bool {
        let Some(station) = self.stations.get_mut(&playlist) else {
            return false;
        };
        station.subscribers = station.subscribers.saturating_sub(1);
        if station.subscribers == 0 {
            self.stations.remove(&playlist);
            tracing::debug!(playlist, "Station went off air");
        }
        true
    }

    /// Song and position a station is broadcasting at `now`.
    ///
    /// Once the current song has run its length a new one is picked and starts
    /// from the beginning. `None` if the playlist is not on air.
    pub fn live(
        &mut self,
        playlist: u32,
        now: f64,
        clip_length: impl Fn(ClipId) -> Option<f32>,
    ) -> Option<LiveClip> {
        let Self { stations, rng } = self;
        let station = stations.get_mut(&playlist)?;

        let elapsed = now - station.started_at;
        let length = clip_length(station.current).unwrap_or(0.0);
        if elapsed >= f64::from(length) {
            station.current = *station.clips.choose(rng)?;
            station.started_at = now;
            tracing::debug!(playlist, current = ?station.current, "Station changed song");
            return Some(LiveClip {
                clip: station.current,
                time: 0.0,
            });
        }
        Some(LiveClip {
            clip: station.current,
            time: elapsed as f32,
        })
    }
}

/// A native handle playing a station.
///
/// Whenever the handle stops (its song ended) the radio retunes it to whatever
/// the station is broadcasting.
#[derive(Clone, Debug)]
pub struct Radio {
    handle: NativeHandleId,
    playlist: Playlist,
    playing: bool,
}

impl Radio {
    /// Create a radio driving `handle`. Nothing plays until [`play`](Self::play).
    #[must_use]
    pub const fn new(handle: NativeHandleId, playlist: Playlist) -> Self {
        Self {
            handle,
            playlist,
            playing: false,
        }
    }

    /// Native handle the radio plays on.
    #[must_use]
    pub const fn handle(&self) -> NativeHandleId {
        self.handle
    }

    /// Playlist the radio is tuned to.
    #[must_use]
    pub const fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Check if the radio is switched on.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    /// Switch the radio on and join its station.
    pub fn play<B: PlaybackBackend>(
        &mut self,
        stations: &mut RadioStations,
        audio: &mut VirtualAudio<B>,
    ) -> Result<()> {
        if self.playing || !stations.subscribe(&self.playlist, audio.now()) {
            return Ok(());
        }
        self.playing = true;
        self.tune(stations, audio)
    }

    /// Switch the radio off.
    pub fn stop<B: PlaybackBackend>(
        &mut self,
        stations: &mut RadioStations,
        audio: &mut VirtualAudio<B>,
    ) {
        if !self.playing {
            return;
        }
        audio.backend_mut().stop(self.handle);
        self.playing = false;
        stations.unsubscribe(self.playlist.id);
    }

    /// Retune the handle once its song has ended.
    pub fn tick<B: PlaybackBackend>(
        &mut self,
        stations: &mut RadioStations,
        audio: &mut VirtualAudio<B>,
    ) -> Result<()> {
        if !self.playing || audio.backend().is_playing(self.handle) {
            return Ok(());
        }
        self.tune(stations, audio)
    }

    fn tune<B: PlaybackBackend>(
        &self,
        stations: &mut RadioStations,
        audio: &mut VirtualAudio<B>,
    ) -> Result<()> {
        let now = audio.now();
        let backend = audio.backend_mut();
        let Some(live) = stations.live(self.playlist.id, now, |clip| backend.clip_length(clip))
        else {
            return Ok(());
        };

        // Songs end on their own so the station can move on.
        if let Some(mut params) = backend.params(self.handle) {
            if params.looping {
                params.looping = false;
                backend.set_params(self.handle, &params);
            }
        }
        backend.set_clip(self.handle, Some(live.clip));
        backend.set_time(self.handle, live.time);
        backend.play(self.handle)?;
        tracing::debug!(clip = ?live.clip, time = live.time, "Radio tuned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;
    use earshot_core::VirtualAudioConfig;

    fn audio() -> VirtualAudio<HeadlessBackend> {
        VirtualAudio::new(HeadlessBackend::new(), VirtualAudioConfig::default())
    }

    #[test]
    fn station_lives_while_subscribed() {
        let mut stations = RadioStations::with_seed(1);
        let playlist = Playlist::new(7, vec![ClipId(0), ClipId(1)]);

        assert!(stations.subscribe(&playlist, 0.0));
        assert!(stations.subscribe(&playlist, 1.0));
        assert_eq!(stations.subscribers(7), 2);

        assert!(stations.unsubscribe(7));
        assert_eq!(stations.len(), 1);
        assert!(stations.unsubscribe(7));
        assert!(stations.is_empty());
        assert!(!stations.unsubscribe(7));
    }

    #[test]
    fn empty_playlist_never_goes_live() {
        let mut stations = RadioStations::with_seed(1);
        assert!(!stations.subscribe(&Playlist::new(1, Vec::new()), 0.0));
        assert!(stations.is_empty());
    }

    #[test]
    fn live_tracks_elapsed_time() {
        let mut stations = RadioStations::with_seed(3);
        let playlist = Playlist::new(1, vec![ClipId(0)]);
        stations.subscribe(&playlist, 10.0);

        let live = stations.live(1, 12.5, |_| Some(30.0)).unwrap();
        assert_eq!(live.clip, ClipId(0));
        assert!((live.time - 2.5).abs() < 1e-6);
    }

    #[test]
    fn finished_song_is_replaced() {
        let mut stations = RadioStations::with_seed(3);
        let playlist = Playlist::new(1, vec![ClipId(0)]);
        stations.subscribe(&playlist, 0.0);

        let live = stations.live(1, 31.0, |_| Some(30.0)).unwrap();
        assert_eq!(live.time, 0.0);
        let later = stations.live(1, 32.0, |_| Some(30.0)).unwrap();
        assert!((later.time - 1.0).abs() < 1e-6);
    }

    #[test]
    fn radios_on_same_playlist_are_in_sync() {
        let mut audio = audio();
        let songs = vec![audio.backend_mut().add_clip(20.0), audio.backend_mut().add_clip(25.0)];
        let playlist = Playlist::new(4, songs);
        let mut stations = RadioStations::with_seed(9);

        let first_handle = audio.backend_mut().create_handle().unwrap();
        let mut first = Radio::new(first_handle, playlist.clone());
        first.play(&mut stations, &mut audio).unwrap();

        audio.advance(3.0);
        let second_handle = audio.backend_mut().create_handle().unwrap();
        let mut second = Radio::new(second_handle, playlist);
        second.play(&mut stations, &mut audio).unwrap();

        let backend = audio.backend();
        assert_eq!(backend.clip(first_handle), backend.clip(second_handle));
        assert!((backend.time(first_handle) - backend.time(second_handle)).abs() < 1e-4);
        assert!((backend.time(second_handle) - 3.0).abs() < 1e-4);
    }

    #[test]
    fn radio_moves_to_next_song() {
        let mut audio = audio();
        let song = audio.backend_mut().add_clip(1.0);
        let mut stations = RadioStations::with_seed(2);
        let handle = audio.backend_mut().create_handle().unwrap();
        let mut radio = Radio::new(handle, Playlist::new(1, vec![song]));
        radio.play(&mut stations, &mut audio).unwrap();

        audio.advance(1.5);
        assert!(!audio.backend().is_playing(handle));
        radio.tick(&mut stations, &mut audio).unwrap();
        assert!(audio.backend().is_playing(handle));
        assert_eq!(audio.backend().time(handle), 0.0);
    }

    #[test]
    fn stop_takes_station_off_air() {
        let mut audio = audio();
        let song = audio.backend_mut().add_clip(10.0);
        let mut stations = RadioStations::with_seed(2);
        let handle = audio.backend_mut().create_handle().unwrap();
        let mut radio = Radio::new(handle, Playlist::new(1, vec![song]));

        radio.play(&mut stations, &mut audio).unwrap();
        radio.play(&mut stations, &mut audio).unwrap();
        assert_eq!(stations.subscribers(1), 1);

        radio.stop(&mut stations, &mut audio);
        assert!(!radio.is_playing());
        assert!(!audio.backend().is_playing(handle));
        assert!(stations.is_empty());

        // Ticking a switched-off radio does nothing.
        radio.tick(&mut stations, &mut audio).unwrap();
        assert!(!audio.backend().is_playing(handle));
    }
}
