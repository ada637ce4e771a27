use super::pattern::{DrumVoice, TrackKind, TrackParams};
use crate::synth::{ArpPattern, Waveform};

/// Preset a new track is instantiated from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub kind: TrackKind,
    pub waveform: Waveform,
    pub duty: f32,
    pub drum_voice: Option<DrumVoice>,
    pub key: Option<char>,
    pub params: TrackParams,
    pub arp_pattern: ArpPattern,
    pub arp_subdivision: u32,
    pub arp_span: usize,
    pub note_offset: usize,
    pub note_span: usize,
    pub preview_note: usize,
    pub volume: f32,
}

impl TrackTemplate {
    /// Field values a template gets when it does not say otherwise
    const BASE: TrackTemplate = TrackTemplate {
        id: "",
        name: "",
        category: "",
        kind: TrackKind::Melodic,
        waveform: Waveform::Pulse,
        duty: 0.5,
        drum_voice: None,
        key: None,
        params: TrackParams::EMPTY,
        arp_pattern: ArpPattern::Up,
        arp_subdivision: 4,
        arp_span: 4,
        note_offset: 0,
        note_span: 12,
        preview_note: 0,
        volume: 0.85,
    };
}

pub static TEMPLATES: [TrackTemplate; 9] = [
    TrackTemplate {
        id: "pulseLead",
        name: "Pulse Lead",
        category: "Melody",
        duty: 0.25,
        key: Some('Q'),
        params: TrackParams {
            attack: Some(0.0015),
            decay: Some(0.09),
            sustain: Some(0.25),
            release: Some(0.16),
            duration: Some(0.42),
            gain: Some(0.7),
            filter_hz: Some(10500.0),
            ..TrackParams::EMPTY
        },
        note_offset: 6,
        note_span: 14,
        preview_note: 4,
        volume: 0.85,
        ..TrackTemplate::BASE
    },
    TrackTemplate {
        id: "chipBass",
        name: "Chip Bass",
        category: "Bass",
        duty: 0.12,
        key: Some('W'),
        params: TrackParams {
            attack: Some(0.002),
            decay: Some(0.12),
            sustain: Some(0.12),
            release: Some(0.09),
            duration: Some(0.34),
            gain: Some(0.9),
            filter_hz: Some(4200.0),
            ..TrackParams::EMPTY
        },
        note_offset: 2,
        note_span: 8,
        preview_note: 2,
        volume: 0.95,
        ..TrackTemplate::BASE
    },
    TrackTemplate {
        id: "trianglePad",
        name: "Triangle Pad",
        category: "Harmony",
        waveform: Waveform::Triangle,
        key: Some('E'),
        params: TrackParams {
            attack: Some(0.01),
            decay: Some(0.32),
            sustain: Some(0.45),
            release: Some(0.45),
            duration: Some(0.7),
            gain: Some(0.62),
            filter_hz: Some(7000.0),
            ..TrackParams::EMPTY
        },
        note_offset: 10,
        note_span: 16,
        preview_note: 6,
        volume: 0.75,
        ..TrackTemplate::BASE
    },
    TrackTemplate {
        id: "arpRunner",
        name: "Arp Runner",
        category: "Sequence",
        kind: TrackKind::Arpeggio,
        duty: 0.4,
        key: Some('R'),
        params: TrackParams {
            attack: Some(0.001),
            decay: Some(0.07),
            sustain: Some(0.1),
            release: Some(0.12),
            duration: Some(0.3),
            gain: Some(0.65),
            filter_hz: Some(9000.0),
            ..TrackParams::EMPTY
        },
        arp_pattern: ArpPattern::UpDown,
        arp_subdivision: 4,
        arp_span: 4,
        note_offset: 6,
        note_span: 12,
        preview_note: 3,
        volume: 0.8,
        ..TrackTemplate::BASE
    },
    TrackTemplate {
        id: "chipKick",
        name: "Chip Kick",
        category: "Drums",
        kind: TrackKind::Drum,
        drum_voice: Some(DrumVoice::Kick),
        key: Some('A'),
        params: TrackParams {
            base_freq: Some(55.0),
            pitch_decay: Some(0.04),
            duration: Some(0.85),
            gain: Some(0.95),
            ..TrackParams::EMPTY
        },
        ..TrackTemplate::BASE
    },
    TrackTemplate {
        id: "chipSnare",
        name: "Bit Snare",
        category: "Drums",
        kind: TrackKind::Drum,
        drum_voice: Some(DrumVoice::Snare),
        key: Some('S'),
        params: TrackParams {
            highpass_hz: Some(1400.0),
            lowpass_hz: Some(8000.0),
            duration: Some(0.19),
            decay: Some(0.08),
            sustain: Some(0.0),
            release: Some(0.05),
            gain: Some(0.75),
            ..TrackParams::EMPTY
        },
        ..TrackTemplate::BASE
    },
    TrackTemplate {
        id: "chipHat",
        name: "Noise Hat",
        category: "Drums",
        kind: TrackKind::Drum,
        drum_voice: Some(DrumVoice::Hat),
        key: Some('D'),
        params: TrackParams {
            highpass_hz: Some(6000.0),
            lowpass_hz: Some(14000.0),
            duration: Some(0.06),
            decay: Some(0.04),
            sustain: Some(0.0),
            release: Some(0.05),
            gain: Some(0.5),
            ..TrackParams::EMPTY
        },
        ..TrackTemplate::BASE
    },
    TrackTemplate {
        id: "chipPerc",
        name: "Glitch Perc",
        category: "Drums",
        kind: TrackKind::Drum,
        drum_voice: Some(DrumVoice::Noise),
        key: Some('F'),
        params: TrackParams {
            highpass_hz: Some(2000.0),
            lowpass_hz: Some(9000.0),
            duration: Some(0.12),
            decay: Some(0.06),
            sustain: Some(0.1),
            release: Some(0.08),
            gain: Some(0.55),
            ..TrackParams::EMPTY
        },
        ..TrackTemplate::BASE
    },
    TrackTemplate {
        id: "samplePad",
        name: "Sample Player",
        category: "Texture",
        kind: TrackKind::Sample,
        key: Some('G'),
        params: TrackParams {
            gain: Some(0.8),
            ..TrackParams::EMPTY
        },
        ..TrackTemplate::BASE
    },
];

/// Tracks a fresh project starts with
pub const INITIAL_TRACKS: [&str; 8] = [
    "pulseLead",
    "chipBass",
    "arpRunner",
    "trianglePad",
    "chipKick",
    "chipSnare",
    "chipHat",
    "chipPerc",
];

pub fn find_template(id: &str) -> Option<&'static TrackTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}
