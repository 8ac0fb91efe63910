//! hecs integration for earshot.
//!
//! Entities with a [`Transform`] and an [`AudioListener`] become virtual
//! listeners; entities with a [`VirtualVoice`](earshot_audio::VirtualVoice)
//! component are started, moved and ticked every frame.

mod components;
mod sync;

pub use components::{AudioListener, Transform};
pub use hecs::{Entity, World};
pub use sync::{ListenerSync, VoiceFrame, VoiceSync};
