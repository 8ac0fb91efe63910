//! Intro, loop and outro clips chained on one primary voice.

use earshot_core::{ClipId, Result};
use serde::{Deserialize, Serialize};

use crate::backend::PlaybackBackend;
use crate::context::VirtualAudio;
use crate::voice::{one_shot_duration, VirtualVoice};

/// Clips making up a looped sound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopClips {
    /// Played once before the loop starts
    pub intro: Option<ClipId>,
    /// Played on repeat
    pub body: ClipId,
    /// Played once when the sequence is stopped
    pub outro: Option<ClipId>,
}

impl LoopClips {
    /// Clips with only a loop body.
    #[must_use]
    pub const fn new(body: ClipId) -> Self {
        Self {
            intro: None,
            body,
            outro: None,
        }
    }

    /// Set the intro clip.
    #[must_use]
    pub const fn with_intro(mut self, intro: ClipId) -> Self {
        self.intro = Some(intro);
        self
    }

    /// Set the outro clip.
    #[must_use]
    pub const fn with_outro(mut self, outro: ClipId) -> Self {
        self.outro = Some(outro);
        self
    }
}

/// Where a [`LoopSequence`] is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SequencePhase {
    /// Nothing playing
    #[default]
    Stopped,
    /// Intro playing, the loop follows at its end
    Intro,
    /// Body looping
    Looping,
    /// Outro playing, the sequence stops at its end
    Outro,
}

/// Drives a primary voice through intro, loop and outro.
///
/// The sequence swaps the voice's clip and looping flag; everything else in
/// the voice settings is left as authored. Call [`tick`](Self::tick) once per
/// frame next to the voice's own tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopSequence {
    clips: LoopClips,
    phase: SequencePhase,
    loop_at: f64,
}

impl LoopSequence {
    /// Create a stopped sequence.
    #[must_use]
    pub const fn new(clips: LoopClips) -> Self {
        Self {
            clips,
            phase: SequencePhase::Stopped,
            loop_at: 0.0,
        }
    }

    /// Clips this sequence plays.
    #[must_use]
    pub const fn clips(&self) -> &LoopClips {
        &self.clips
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SequencePhase {
        self.phase
    }

    /// Start from the intro, or straight from the loop without one.
    ///
    /// No-op on adapter voices.
    pub fn play<B: PlaybackBackend>(
        &mut self,
        voice: &mut VirtualVoice,
        audio: &mut VirtualAudio<B>,
    ) -> Result<()> {
        let intro = self
            .clips
            .intro
            .and_then(|clip| audio.backend().clip_length(clip).map(|len| (clip, len)));
        let Some((intro, length)) = intro else {
            return self.enter_loop(voice, audio);
        };

        let epsilon = audio.config().pitch_epsilon;
        let Some(settings) = voice.settings_mut() else {
            return Ok(());
        };
        settings.clip = Some(intro);
        settings.params.looping = false;
        let pitch = settings.params.clamped().pitch;

        self.phase = SequencePhase::Intro;
        self.loop_at = audio.now() + f64::from(one_shot_duration(length, pitch, epsilon));
        tracing::debug!(loop_at = self.loop_at, "Sequence intro");
        voice.play(audio)
    }

    /// Play the outro, or stop the voice right away without one.
    pub fn stop<B: PlaybackBackend>(
        &mut self,
        voice: &mut VirtualVoice,
        audio: &mut VirtualAudio<B>,
    ) -> Result<()> {
        if matches!(self.phase, SequencePhase::Stopped | SequencePhase::Outro) {
            return Ok(());
        }
        let outro = self.clips.outro;
        match (outro, voice.settings_mut()) {
            (Some(outro), Some(settings)) => {
                settings.clip = Some(outro);
                settings.params.looping = false;
                self.phase = SequencePhase::Outro;
                tracing::debug!("Sequence outro");
                voice.play(audio)
            }
            _ => {
                voice.stop(audio);
                self.phase = SequencePhase::Stopped;
                Ok(())
            }
        }
    }

    /// Move from the intro to the loop, and from the outro to stopped.
    pub fn tick<B: PlaybackBackend>(
        &mut self,
        voice: &mut VirtualVoice,
        audio: &mut VirtualAudio<B>,
    ) -> Result<SequencePhase> {
        match self.phase {
            SequencePhase::Intro if audio.now() >= self.loop_at => {
                self.enter_loop(voice, audio)?;
            }
            SequencePhase::Outro if !voice.state().is_active() => {
                self.phase = SequencePhase::Stopped;
            }
            _ => {}
        }
        Ok(self.phase)
    }

    fn enter_loop<B: PlaybackBackend>(
        &mut self,
        voice: &mut VirtualVoice,
        audio: &mut VirtualAudio<B>,
    ) -> Result<()> {
        let Some(settings) = voice.settings_mut() else {
            return Ok(());
        };
        settings.clip = Some(self.clips.body);
        settings.params.looping = true;
        self.phase = SequencePhase::Looping;
        tracing::debug!("Sequence looping");
        voice.play(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;
    use earshot_core::{Pose, VirtualAudioConfig, VoiceSettings};
    use glam::Vec3;

    struct Fixture {
        audio: VirtualAudio<HeadlessBackend>,
        voice: VirtualVoice,
        intro: ClipId,
        body: ClipId,
        outro: ClipId,
    }

    fn fixture() -> Fixture {
        let mut backend = HeadlessBackend::new();
        let intro = backend.add_clip(1.0);
        let body = backend.add_clip(2.0);
        let outro = backend.add_clip(0.5);
        let mut audio = VirtualAudio::new(backend, VirtualAudioConfig::default());
        audio.register_listener(Pose::from_position(Vec3::ZERO));
        let voice = VirtualVoice::primary(VoiceSettings::default().play_on_awake(false));
        Fixture {
            audio,
            voice,
            intro,
            body,
            outro,
        }
    }

    fn proxy_clip(fx: &Fixture) -> Option<ClipId> {
        let lease = fx.voice.proxy()?;
        let handle = fx.audio.existing_manager()?.pool.handle(lease)?;
        fx.audio.backend().clip(handle)
    }

    fn run(fx: &mut Fixture, sequence: &mut LoopSequence, frames: usize) {
        for _ in 0..frames {
            fx.audio.advance(0.1);
            fx.voice.tick(&mut fx.audio).unwrap();
            sequence.tick(&mut fx.voice, &mut fx.audio).unwrap();
        }
    }

    #[test]
    fn intro_hands_over_to_loop() {
        let mut fx = fixture();
        let mut sequence = LoopSequence::new(LoopClips::new(fx.body).with_intro(fx.intro));

        sequence.play(&mut fx.voice, &mut fx.audio).unwrap();
        assert_eq!(sequence.phase(), SequencePhase::Intro);
        assert_eq!(proxy_clip(&fx), Some(fx.intro));

        run(&mut fx, &mut sequence, 12);
        assert_eq!(sequence.phase(), SequencePhase::Looping);
        assert_eq!(proxy_clip(&fx), Some(fx.body));

        // The body keeps the voice alive well past its own length.
        run(&mut fx, &mut sequence, 50);
        assert!(fx.voice.state().is_active());
    }

    #[test]
    fn intro_window_scales_with_pitch() {
        let mut fx = fixture();
        fx.voice.settings_mut().unwrap().params.pitch = 2.0;
        let mut sequence = LoopSequence::new(LoopClips::new(fx.body).with_intro(fx.intro));

        sequence.play(&mut fx.voice, &mut fx.audio).unwrap();
        run(&mut fx, &mut sequence, 6);
        assert_eq!(sequence.phase(), SequencePhase::Looping);
    }

    #[test]
    fn without_intro_loop_starts_at_once() {
        let mut fx = fixture();
        let mut sequence = LoopSequence::new(LoopClips::new(fx.body));

        sequence.play(&mut fx.voice, &mut fx.audio).unwrap();
        assert_eq!(sequence.phase(), SequencePhase::Looping);
        assert_eq!(proxy_clip(&fx), Some(fx.body));
        assert!(fx.voice.settings().unwrap().params.looping);
    }

    #[test]
    fn outro_plays_out_then_stops() {
        let mut fx = fixture();
        let mut sequence = LoopSequence::new(LoopClips::new(fx.body).with_outro(fx.outro));
        sequence.play(&mut fx.voice, &mut fx.audio).unwrap();
        run(&mut fx, &mut sequence, 3);

        sequence.stop(&mut fx.voice, &mut fx.audio).unwrap();
        assert_eq!(sequence.phase(), SequencePhase::Outro);
        assert_eq!(proxy_clip(&fx), Some(fx.outro));
        assert!(!fx.voice.settings().unwrap().params.looping);

        run(&mut fx, &mut sequence, 8);
        assert_eq!(sequence.phase(), SequencePhase::Stopped);
        assert!(!fx.voice.state().is_active());
    }

    #[test]
    fn stop_without_outro_releases_voice() {
        let mut fx = fixture();
        let mut sequence = LoopSequence::new(LoopClips::new(fx.body));
        sequence.play(&mut fx.voice, &mut fx.audio).unwrap();

        sequence.stop(&mut fx.voice, &mut fx.audio).unwrap();
        assert_eq!(sequence.phase(), SequencePhase::Stopped);
        assert!(fx.voice.proxy().is_none());
    }

    #[test]
    fn stop_during_intro_skips_loop() {
        let mut fx = fixture();
        let clips = LoopClips::new(fx.body)
            .with_intro(fx.intro)
            .with_outro(fx.outro);
        let mut sequence = LoopSequence::new(clips);
        sequence.play(&mut fx.voice, &mut fx.audio).unwrap();

        sequence.stop(&mut fx.voice, &mut fx.audio).unwrap();
        run(&mut fx, &mut sequence, 20);
        assert_eq!(sequence.phase(), SequencePhase::Stopped);
        assert!(fx.voice.proxy().is_none());
    }
}
