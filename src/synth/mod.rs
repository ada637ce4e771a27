pub mod arp;
pub mod automation;
pub mod envelope;
pub mod pulse;
pub mod render;
pub mod sampler;
pub mod sfx;
pub mod voice;
pub mod voices;

pub use arp::{resolve_arp_sequence, ArpPattern};
pub use automation::{Automation, AutomationEvent};
pub use envelope::{Envelope, EnvelopeLimits, DRUM_LIMITS, NOISE_LIMITS, TONE_LIMITS};
pub use pulse::{PeriodicWave, PulseWaveCache, MAX_DUTY, MIN_DUTY, PULSE_HARMONICS};
pub use render::ActiveVoice;
pub use sampler::{decode_wav, SampleBuffer};
pub use sfx::{CannedFx, SOUNDBOARD};
pub use voice::{BusInput, OscShape, ScheduledVoice, VoiceSource};
pub use voices::{
    ArpRequest, DrumParams, NoiseColor, NoiseParams, SampleParams, ToneParams, Voices, Waveform,
};
