//! Headless split-screen simulation for earshot.
//!
//! Two players walk around opposite ends of a level, each with their own
//! camera. A motor-driven engine, footstep one-shots and a radio playing a
//! playlist through a native handle are all rendered through a single real
//! listener, and the proxy positions are logged as the simulation runs.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p earshot-splitscreen
//! cargo run -p earshot-splitscreen -- --frames 1200 --config earshot.toml
//! RUST_LOG=earshot_audio=trace cargo run -p earshot-splitscreen
//! ```

use std::path::PathBuf;

use earshot_audio::{
    HeadlessBackend, Motor, MotorSettings, PlaybackBackend, Playlist, Radio, RadioStations,
    VirtualAudio, VirtualVoice,
};
use earshot_core::{PlaybackParams, Pose, VirtualAudioConfig, VoiceSettings};
use earshot_scene::{AudioListener, Entity, ListenerSync, Transform, VoiceSync, World};
use glam::Vec3;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Fixed simulation step.
const FRAME_TIME: f32 = 1.0 / 60.0;

/// Frames simulated when `--frames` is not given.
const DEFAULT_FRAMES: u64 = 600;

/// Frames between two status reports.
const REPORT_INTERVAL: u64 = 60;

/// Frames between two footsteps.
const FOOTSTEP_INTERVAL: u64 = 30;

struct Args {
    config: Option<PathBuf>,
    frames: u64,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config: None,
        frames: DEFAULT_FRAMES,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let path = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
                parsed.config = Some(PathBuf::from(path));
                i += 1;
            }
            "--frames" | "-f" => {
                let frames = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--frames requires a number"))?;
                parsed.frames = frames.parse()?;
                i += 1;
            }
            "--help" | "-h" => {
                println!("earshot split-screen simulation");
                println!();
                println!("Usage: earshot-splitscreen [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  TOML file with virtual audio settings");
                println!("  -f, --frames <N>     Number of frames to simulate (default: 600)");
                println!("  -h, --help           Show this help message");
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    Ok(parsed)
}

struct Level {
    players: [Entity; 2],
    engine: Entity,
    footsteps: Entity,
    radio: Entity,
    motor: Motor,
    stations: RadioStations,
    tuner: Radio,
}

fn spawn_level(
    world: &mut World,
    audio: &mut VirtualAudio<HeadlessBackend>,
) -> anyhow::Result<Level> {
    let backend = audio.backend_mut();
    let engine_clip = backend.add_clip(2.0);
    let footstep_clip = backend.add_clip(0.4);
    let songs = vec![backend.add_clip(30.0), backend.add_clip(45.0), backend.add_clip(20.0)];
    let radio_handle = backend.create_handle()?;

    let players = [
        world.spawn((
            Transform::looking_at(Vec3::new(-100.0, 1.7, 0.0), Vec3::new(-100.0, 1.7, -10.0)),
            AudioListener::default(),
        )),
        world.spawn((
            Transform::looking_at(Vec3::new(100.0, 1.7, 0.0), Vec3::new(100.0, 1.7, -10.0)),
            AudioListener::default(),
        )),
    ];

    // The motor owns the engine's clip, pitch and volume.
    let engine = world.spawn((
        Transform::from_position(Vec3::new(-95.0, 0.5, -4.0)),
        VirtualVoice::primary(VoiceSettings::default().play_on_awake(false).spatial_blend(1.0)),
    ));
    let motor = Motor::new(MotorSettings {
        clip: Some(engine_clip),
        ..MotorSettings::default()
    });

    let footsteps = world.spawn((
        Transform::from_position(Vec3::new(100.0, 0.0, 0.0)),
        VirtualVoice::primary(
            VoiceSettings::with_clip(footstep_clip)
                .play_on_awake(false)
                .spatial_blend(1.0),
        ),
    ));

    // The radio plays on its own native handle; the adapter only mirrors it.
    let params = PlaybackParams {
        volume: 0.6,
        spatial_blend: 1.0,
        ..PlaybackParams::default()
    };
    audio.backend_mut().set_params(radio_handle, &params);
    let radio = world.spawn((
        Transform::from_position(Vec3::new(104.0, 1.0, -6.0)),
        VirtualVoice::adapter(radio_handle),
    ));

    Ok(Level {
        players,
        engine,
        footsteps,
        radio,
        motor,
        stations: RadioStations::new(),
        tuner: Radio::new(radio_handle, Playlist::new(1, songs)),
    })
}

fn move_players(world: &mut World, level: &Level, time: f32) -> anyhow::Result<()> {
    for (i, &player) in level.players.iter().enumerate() {
        let mut transform = world.get::<&mut Transform>(player)?;
        let side = if i == 0 { -100.0 } else { 100.0 };
        let phase = time * 0.5 + i as f32;
        let position = Vec3::new(side + phase.sin() * 5.0, 1.7, phase.cos() * 5.0);
        *transform = Transform::looking_at(position, position + Vec3::new(0.0, 0.0, -1.0));
    }

    // Player two carries the footsteps.
    let carrier = world.get::<&Transform>(level.players[1])?.position;
    world.get::<&mut Transform>(level.footsteps)?.position = carrier - Vec3::Y * 1.7;
    Ok(())
}

fn report(world: &World, audio: &VirtualAudio<HeadlessBackend>, level: &Level) {
    let Some(manager) = audio.existing_manager() else {
        return;
    };
    for (name, entity) in [
        ("engine", level.engine),
        ("footsteps", level.footsteps),
        ("radio", level.radio),
    ] {
        let Ok(voice) = world.get::<&VirtualVoice>(entity) else {
            continue;
        };
        let proxy = voice
            .proxy()
            .and_then(|lease| manager.pool.handle(lease))
            .and_then(|handle| audio.backend().handle(handle));
        match proxy {
            Some(proxy) => info!(
                voice = name,
                emitter = ?voice.pose().position,
                listener = ?voice.listener(),
                proxy = ?proxy.position,
                time = proxy.time,
                "Voice active"
            ),
            None => info!(voice = name, "Voice idle"),
        }
    }
    info!(
        proxies = manager.pool.len(),
        lent = manager.pool.lent_len(),
        listeners = manager.listeners.len(),
        "Pool status"
    );
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading virtual audio config");
            VirtualAudioConfig::load(path)?
        }
        None => {
            let anchor = Pose::from_position(Vec3::new(0.0, -1000.0, 0.0));
            VirtualAudioConfig::default().with_anchor(anchor)
        }
    };

    let mut audio = VirtualAudio::new(HeadlessBackend::new(), config);
    let mut world = World::new();
    let mut level = spawn_level(&mut world, &mut audio)?;

    let mut listeners = ListenerSync::new();
    let mut voices = VoiceSync::new();

    info!(frames = args.frames, "Starting split-screen simulation");
    level.tuner.play(&mut level.stations, &mut audio)?;
    {
        let mut engine = world.get::<&mut VirtualVoice>(level.engine)?;
        level.motor.start(&mut engine, &mut audio)?;
    }

    // The engine is switched off for the last fifth of the run.
    let engine_off_at = args.frames - args.frames / 5;
    for frame in 0..args.frames {
        audio.advance(FRAME_TIME);
        let time = audio.now() as f32;
        move_players(&mut world, &level, time)?;
        listeners.sync(&world, &mut audio);
        level.tuner.tick(&mut level.stations, &mut audio)?;

        if frame == engine_off_at {
            level.motor.stop();
        }
        level.motor.set_target_speed(time.sin().mul_add(0.5, 0.5));
        level.motor.set_target_thrust(time.cos().mul_add(0.5, 0.5));
        {
            let mut engine = world.get::<&mut VirtualVoice>(level.engine)?;
            level.motor.update(&mut engine, &mut audio, FRAME_TIME);
        }

        if frame % FOOTSTEP_INTERVAL == 0 {
            let mut voice = world.get::<&mut VirtualVoice>(level.footsteps)?;
            if let Some(clip) = voice.settings().and_then(|s| s.clip) {
                voice.play_one_shot(&mut audio, clip, 0.8)?;
            }
        }

        let stats = voices.tick(&mut world, &mut audio);
        if frame % REPORT_INTERVAL == 0 {
            info!(frame, active = stats.active, idle = stats.idle, "Frame");
            report(&world, &audio, &level);
        }
    }

    level.tuner.stop(&mut level.stations, &mut audio);
    audio.shutdown();
    info!("Simulation finished");
    Ok(())
}
