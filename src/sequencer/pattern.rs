use rand::Rng;
use serde::{Deserialize, Serialize};

use super::templates::{find_template, TrackTemplate};
use crate::pitch::{
    generate_scale_for, PitchClass, ScaleMode, ScaleNote, MAX_SCALE_OCTAVES, MAX_START_OCTAVE,
    MIN_START_OCTAVE, NOTE_NAMES,
};
use crate::synth::{
    ArpPattern, DrumParams, NoiseColor, NoiseParams, SampleBuffer, SampleParams, ToneParams,
    Waveform,
};

pub const DEFAULT_PATTERN_LENGTH: usize = 16;
pub const MIN_PATTERN_LENGTH: usize = 1;
pub const MAX_PATTERN_LENGTH: usize = 64;

/// Trigger keys handed out to new tracks, in order of preference
pub const KEY_POOL: &str = "QWERTYUIOPASDFGHJKLZXCVBNM1234567890";

/// Velocity given to a note placed with `cycle_cell`
const DEFAULT_NOTE_VELOCITY: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Melodic,
    Arpeggio,
    Drum,
    Sample,
}

impl TrackKind {
    pub fn name(&self) -> &'static str {
        match self {
            TrackKind::Melodic => "melodic",
            TrackKind::Arpeggio => "arpeggio",
            TrackKind::Drum => "drum",
            TrackKind::Sample => "sample",
        }
    }

    /// Drum and sample tracks store velocity levels instead of notes
    pub fn is_rhythm(&self) -> bool {
        matches!(self, TrackKind::Drum | TrackKind::Sample)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumVoice {
    Kick,
    Snare,
    Hat,
    Noise,
}

impl DrumVoice {
    pub fn name(&self) -> &'static str {
        match self {
            DrumVoice::Kick => "kick",
            DrumVoice::Snare => "snare",
            DrumVoice::Hat => "hat",
            DrumVoice::Noise => "noise",
        }
    }

    /// Chance of a hit per step when randomizing
    pub fn density(&self) -> f64 {
        match self {
            DrumVoice::Hat => 0.45,
            DrumVoice::Kick => 0.3,
            _ => 0.25,
        }
    }
}

/// One placed note: index into the track's scale window plus a velocity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteStep {
    pub note_index: usize,
    pub velocity: u8, // 1-3
}

/// Per-track step storage; the variant follows the track kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Steps {
    /// Drum/sample velocity levels, 0 = off
    Levels(Vec<u8>),
    /// Melodic/arpeggio notes
    Notes(Vec<Option<NoteStep>>),
}

impl Steps {
    pub fn empty(kind: TrackKind, len: usize) -> Self {
        if kind.is_rhythm() {
            Steps::Levels(vec![0; len])
        } else {
            Steps::Notes(vec![None; len])
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Steps::Levels(v) => v.len(),
            Steps::Notes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Active cell at `step`, if any
    pub fn hit(&self, step: usize) -> Option<Hit> {
        match self {
            Steps::Levels(v) => match v.get(step).copied() {
                Some(level) if level > 0 => Some(Hit {
                    velocity: level,
                    note_index: None,
                }),
                _ => None,
            },
            Steps::Notes(v) => v.get(step).copied().flatten().map(|n| Hit {
                velocity: n.velocity,
                note_index: Some(n.note_index),
            }),
        }
    }
}

/// What the scheduler reads from an active cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub velocity: u8,
    pub note_index: Option<usize>,
}

/// A value written into one cell by `set_step_value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepValue {
    Off,
    /// Drum/sample level 0-3
    Level(u8),
    Note(NoteStep),
}

/// Optional overrides of the voice defaults. Unset fields use the voice's own default; every
/// value is clamped by the voice at trigger time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackParams {
    pub attack: Option<f64>,
    pub decay: Option<f64>,
    pub sustain: Option<f32>,
    pub release: Option<f64>,
    pub duration: Option<f64>,
    pub gain: Option<f32>,
    pub filter_hz: Option<f32>,
    pub base_freq: Option<f32>,
    pub pitch_decay: Option<f64>,
    pub highpass_hz: Option<f32>,
    pub lowpass_hz: Option<f32>,
    pub playback_rate: Option<f32>,
}

impl TrackParams {
    pub const EMPTY: TrackParams = TrackParams {
        attack: None,
        decay: None,
        sustain: None,
        release: None,
        duration: None,
        gain: None,
        filter_hz: None,
        base_freq: None,
        pitch_decay: None,
        highpass_hz: None,
        lowpass_hz: None,
        playback_rate: None,
    };

    pub fn tone(&self, waveform: Waveform, freq: f32) -> ToneParams {
        let d = ToneParams::for_waveform(waveform, freq);
        ToneParams {
            freq,
            duration: self.duration.unwrap_or(d.duration),
            gain: self.gain.unwrap_or(d.gain),
            attack: self.attack.unwrap_or(d.attack),
            decay: self.decay.unwrap_or(d.decay),
            sustain: self.sustain.unwrap_or(d.sustain),
            release: self.release.unwrap_or(d.release),
            filter_hz: self.filter_hz.unwrap_or(d.filter_hz),
        }
    }

    pub fn noise(&self) -> NoiseParams {
        let d = NoiseParams::default();
        NoiseParams {
            duration: self.duration.unwrap_or(d.duration),
            gain: self.gain.unwrap_or(d.gain),
            attack: self.attack.unwrap_or(d.attack),
            decay: self.decay.unwrap_or(d.decay),
            sustain: self.sustain.unwrap_or(d.sustain),
            release: self.release.unwrap_or(d.release),
            color: NoiseColor::White,
            highpass_hz: self.highpass_hz.unwrap_or(d.highpass_hz),
            lowpass_hz: self.lowpass_hz.unwrap_or(d.lowpass_hz),
        }
    }

    pub fn drum(&self) -> DrumParams {
        let d = DrumParams::default();
        DrumParams {
            base_freq: self.base_freq.unwrap_or(d.base_freq),
            pitch_decay: self.pitch_decay.unwrap_or(d.pitch_decay),
            duration: self.duration.unwrap_or(d.duration),
            gain: self.gain.unwrap_or(d.gain),
            attack: self.attack.unwrap_or(d.attack),
            decay: self.decay.unwrap_or(d.decay),
            sustain: self.sustain.unwrap_or(d.sustain),
            release: self.release.unwrap_or(d.release),
        }
    }

    pub fn sample(&self) -> SampleParams {
        let d = SampleParams::default();
        SampleParams {
            gain: self.gain.unwrap_or(d.gain),
            playback_rate: self.playback_rate.unwrap_or(d.playback_rate),
        }
    }
}

/// Half-open range of the global scale a track can reach
pub fn window_bounds(scale_len: usize, offset: usize, span: usize) -> (usize, usize) {
    if scale_len == 0 {
        return (0, 0);
    }
    let span = span.max(1);
    let max_offset = scale_len.saturating_sub(span);
    let start = offset.min(max_offset);
    (start, (start + span).min(scale_len))
}

fn clamp_level(level: u8) -> u8 {
    level.min(3)
}

fn clamp_note(step: NoteStep, window_len: usize) -> NoteStep {
    NoteStep {
        note_index: step.note_index.min(window_len.saturating_sub(1)),
        velocity: step.velocity.clamp(1, 3),
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub uid: u64,
    pub template_id: &'static str,
    pub name: String,
    pub category: &'static str,
    pub kind: TrackKind,
    pub waveform: Waveform,
    pub duty: f32,
    pub drum_voice: Option<DrumVoice>,
    pub params: TrackParams,
    pub volume: f32,
    pub muted: bool,
    pub soloed: bool,
    pub key: Option<char>,
    pub arp_pattern: ArpPattern,
    pub arp_subdivision: u32,
    pub arp_span: usize,
    pub note_offset: usize,
    pub note_span: usize,
    pub preview_note: usize,
    pub sample: Option<SampleBuffer>,
    steps: Steps,
}

impl Track {
    pub fn from_template(
        template: &TrackTemplate,
        uid: u64,
        key: Option<char>,
        pattern_length: usize,
    ) -> Self {
        Self {
            uid,
            template_id: template.id,
            name: template.name.to_string(),
            category: template.category,
            kind: template.kind,
            waveform: template.waveform,
            duty: template.duty,
            drum_voice: template.drum_voice,
            params: template.params,
            volume: template.volume,
            muted: false,
            soloed: false,
            key,
            arp_pattern: template.arp_pattern,
            arp_subdivision: template.arp_subdivision,
            arp_span: template.arp_span,
            note_offset: template.note_offset,
            note_span: template.note_span,
            preview_note: template.preview_note,
            sample: None,
            steps: Steps::empty(template.kind, pattern_length),
        }
    }

    pub fn steps(&self) -> &Steps {
        &self.steps
    }

    pub fn hit(&self, step: usize) -> Option<Hit> {
        self.steps.hit(step)
    }

    /// Window into a scale of `scale_len` notes
    pub fn window(&self, scale_len: usize) -> (usize, usize) {
        window_bounds(scale_len, self.note_offset, self.note_span)
    }

    pub fn window_len(&self, scale_len: usize) -> usize {
        let (start, end) = self.window(scale_len);
        end - start
    }

    /// Re-fit offset, steps and preview note to the current scale window
    pub fn clamp_to_scale(&mut self, scale_len: usize) {
        let (start, end) = self.window(scale_len);
        if scale_len > 0 {
            self.note_offset = start;
        }
        let len = end - start;
        match &mut self.steps {
            Steps::Levels(levels) => {
                for level in levels.iter_mut() {
                    *level = clamp_level(*level);
                }
            }
            Steps::Notes(notes) => {
                if len == 0 {
                    notes.iter_mut().for_each(|n| *n = None);
                    self.preview_note = 0;
                    return;
                }
                for note in notes.iter_mut().flatten() {
                    *note = clamp_note(*note, len);
                }
                self.preview_note = self.preview_note.min(len - 1);
            }
        }
    }

    /// Truncate or pad to `length` steps
    pub fn resize(&mut self, length: usize, scale_len: usize) {
        let window_len = self.window_len(scale_len);
        match &mut self.steps {
            Steps::Levels(levels) => {
                levels.resize(length, 0);
                for level in levels.iter_mut() {
                    *level = clamp_level(*level);
                }
            }
            Steps::Notes(notes) => {
                notes.resize(length, None);
                for note in notes.iter_mut() {
                    *note = match note {
                        Some(n) if window_len > 0 => Some(clamp_note(*n, window_len)),
                        _ => None,
                    };
                }
            }
        }
    }

    /// Returns false when the value does not fit this track's kind or the step is out of range
    pub fn set_step(&mut self, step: usize, value: StepValue, scale_len: usize) -> bool {
        let window_len = self.window_len(scale_len);
        match (&mut self.steps, value) {
            (Steps::Levels(levels), StepValue::Level(level)) => match levels.get_mut(step) {
                Some(cell) => {
                    *cell = clamp_level(level);
                    true
                }
                None => false,
            },
            (Steps::Levels(levels), StepValue::Off) => match levels.get_mut(step) {
                Some(cell) => {
                    *cell = 0;
                    true
                }
                None => false,
            },
            (Steps::Notes(notes), StepValue::Note(note)) => {
                if window_len == 0 {
                    return false;
                }
                match notes.get_mut(step) {
                    Some(cell) => {
                        *cell = Some(clamp_note(note, window_len));
                        true
                    }
                    None => false,
                }
            }
            (Steps::Notes(notes), StepValue::Off) => match notes.get_mut(step) {
                Some(cell) => {
                    *cell = None;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Drum: 0 -> 1 -> 2 -> 3 -> 0. Melodic: off -> preview note -> next note ... -> off.
    pub fn cycle_cell(&mut self, step: usize, scale_len: usize) {
        let window_len = self.window_len(scale_len);
        let preview = self.preview_note;
        match &mut self.steps {
            Steps::Levels(levels) => {
                if let Some(cell) = levels.get_mut(step) {
                    *cell = (*cell + 1) % 4;
                }
            }
            Steps::Notes(notes) => {
                if window_len == 0 {
                    return;
                }
                let Some(cell) = notes.get_mut(step) else {
                    return;
                };
                *cell = match *cell {
                    None => Some(NoteStep {
                        note_index: preview.min(window_len - 1),
                        velocity: DEFAULT_NOTE_VELOCITY,
                    }),
                    Some(n) if n.note_index >= window_len - 1 => None,
                    Some(n) => Some(NoteStep {
                        note_index: n.note_index + 1,
                        ..n
                    }),
                };
            }
        }
    }

    pub fn decrease_cell(&mut self, step: usize) {
        match &mut self.steps {
            Steps::Levels(levels) => {
                if let Some(cell) = levels.get_mut(step) {
                    *cell = cell.saturating_sub(1);
                }
            }
            Steps::Notes(notes) => {
                if let Some(cell) = notes.get_mut(step) {
                    *cell = match *cell {
                        Some(n) if n.note_index > 0 => Some(NoteStep {
                            note_index: n.note_index - 1,
                            ..n
                        }),
                        _ => None,
                    };
                }
            }
        }
    }

    /// Velocity cycles 1 -> 2 -> 3 -> 1; an empty cell starts at 1
    pub fn bump_velocity(&mut self, step: usize, scale_len: usize) {
        let window_len = self.window_len(scale_len);
        let preview = self.preview_note;
        match &mut self.steps {
            Steps::Levels(levels) => {
                if let Some(cell) = levels.get_mut(step) {
                    *cell = if *cell == 0 { 1 } else { (*cell % 3) + 1 };
                }
            }
            Steps::Notes(notes) => {
                if window_len == 0 {
                    return;
                }
                let Some(cell) = notes.get_mut(step) else {
                    return;
                };
                *cell = match *cell {
                    None => Some(NoteStep {
                        note_index: preview.min(window_len - 1),
                        velocity: 1,
                    }),
                    Some(n) => Some(NoteStep {
                        velocity: (n.velocity.max(1) % 3) + 1,
                        ..n
                    }),
                };
            }
        }
    }

    /// Shift the scale window by `delta` notes, then re-fit
    pub fn adjust_register(&mut self, delta: i32, scale_len: usize) {
        let span = self.note_span.max(1);
        let max_offset = scale_len.saturating_sub(span) as i64;
        let next = (self.note_offset as i64 + delta as i64).clamp(0, max_offset);
        self.note_offset = next as usize;
        self.clamp_to_scale(scale_len);
    }

    pub fn clear(&mut self) {
        let len = self.steps.len();
        self.steps = Steps::empty(self.kind, len);
    }

    pub fn randomize<R: Rng>(&mut self, scale_len: usize, rng: &mut R) {
        let window_len = self.window_len(scale_len);
        let density = self.drum_voice.map(|d| d.density()).unwrap_or(0.25);
        match &mut self.steps {
            Steps::Levels(levels) => {
                for level in levels.iter_mut() {
                    *level = if rng.gen_bool(density) {
                        rng.gen_range(1..=3)
                    } else {
                        0
                    };
                }
            }
            Steps::Notes(notes) => {
                for note in notes.iter_mut() {
                    *note = if window_len == 0 || rng.gen::<f64>() < 0.65 {
                        None
                    } else {
                        Some(NoteStep {
                            note_index: rng.gen_range(0..window_len),
                            velocity: rng.gen_range(1..=3),
                        })
                    };
                }
            }
        }
    }

    /// Arpeggio pool starting at `note_index`: every other window note, `arp_span` notes at most
    pub fn arp_pool(&self, window: &[ScaleNote], note_index: usize) -> Vec<f32> {
        let span = self.arp_span.max(1);
        window
            .iter()
            .skip(note_index)
            .step_by(2)
            .take(span)
            .map(|n| n.frequency_hz as f32)
            .collect()
    }
}

/// The global scale tracks pick their notes from
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    pub root: String,
    pub mode: ScaleMode,
    pub start_octave: i32,
    pub octaves: usize,
    notes: Vec<ScaleNote>,
}

impl Scale {
    /// An unrecognised root leaves the scale empty. Octave settings are clamped.
    pub fn new(root: &str, mode: ScaleMode, start_octave: i32, octaves: usize) -> Self {
        let start_octave = start_octave.clamp(MIN_START_OCTAVE, MAX_START_OCTAVE);
        let octaves = octaves.min(MAX_SCALE_OCTAVES);
        let notes = match PitchClass::from_name(root) {
            Some(pc) => generate_scale_for(pc, mode, start_octave, octaves),
            None => Vec::new(),
        };
        Self {
            root: root.to_string(),
            mode,
            start_octave,
            octaves,
            notes,
        }
    }

    pub fn notes(&self) -> &[ScaleNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Tracks, the scale, and pattern length. Read by the scheduler, mutated by the engine.
#[derive(Debug, Clone)]
pub struct Project {
    tracks: Vec<Track>,
    scale: Scale,
    pattern_length: usize,
    selected: usize,
    next_uid: u64,
}

impl Project {
    pub fn new(pattern_length: usize, scale: Scale) -> Self {
        Self {
            tracks: Vec::new(),
            scale,
            pattern_length: pattern_length.clamp(MIN_PATTERN_LENGTH, MAX_PATTERN_LENGTH),
            selected: 0,
            next_uid: 0,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn pattern_length(&self) -> usize {
        self.pattern_length
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_track(&mut self, index: usize) {
        if index < self.tracks.len() {
            self.selected = index;
        }
    }

    /// Notes of a track's visible window
    pub fn window(&self, index: usize) -> &[ScaleNote] {
        match self.tracks.get(index) {
            Some(track) => {
                let (start, end) = track.window(self.scale.len());
                &self.scale.notes[start..end]
            }
            None => &[],
        }
    }

    /// Preferred key if free, else the first free key of the pool
    pub fn assign_key(&self, preferred: Option<char>) -> Option<char> {
        let used = |c: char| self.tracks.iter().any(|t| t.key == Some(c));
        if let Some(key) = preferred {
            if !used(key) {
                return Some(key);
            }
        }
        KEY_POOL.chars().find(|&c| !used(c))
    }

    /// Append a track built from a template and select it
    pub fn add_track(&mut self, template_id: &str) -> Option<usize> {
        let template = find_template(template_id)?;
        self.next_uid += 1;
        let key = self.assign_key(template.key);
        let mut track = Track::from_template(template, self.next_uid, key, self.pattern_length);
        track.clamp_to_scale(self.scale.len());
        self.tracks.push(track);
        self.selected = self.tracks.len() - 1;
        Some(self.selected)
    }

    pub fn remove_track(&mut self, index: usize) -> Option<Track> {
        if index >= self.tracks.len() {
            return None;
        }
        let removed = self.tracks.remove(index);
        if self.selected >= self.tracks.len() {
            self.selected = self.tracks.len().saturating_sub(1);
        }
        Some(removed)
    }

    pub fn set_track_volume(&mut self, index: usize, volume: f32) {
        if let Some(track) = self.tracks.get_mut(index) {
            track.volume = if volume.is_finite() {
                volume.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
    }

    pub fn set_track_duty(&mut self, index: usize, duty: f32) {
        if let Some(track) = self.tracks.get_mut(index) {
            track.duty = if duty.is_finite() {
                duty.clamp(0.05, 0.95)
            } else {
                0.5
            };
        }
    }

    pub fn toggle_mute(&mut self, index: usize) -> Option<bool> {
        let track = self.tracks.get_mut(index)?;
        track.muted = !track.muted;
        Some(track.muted)
    }

    /// Soloing a muted track also unmutes it
    pub fn toggle_solo(&mut self, index: usize) -> Option<bool> {
        let track = self.tracks.get_mut(index)?;
        track.soloed = !track.soloed;
        if track.soloed {
            track.muted = false;
        }
        Some(track.soloed)
    }

    pub fn any_soloed(&self) -> bool {
        self.tracks.iter().any(|t| t.soloed)
    }

    /// Muted tracks never play; with any solo active, only soloed tracks do
    pub fn is_audible(&self, index: usize) -> bool {
        match self.tracks.get(index) {
            Some(track) => !track.muted && (track.soloed || !self.any_soloed()),
            None => false,
        }
    }

    pub fn set_step_value(&mut self, track: usize, step: usize, value: StepValue) -> bool {
        let scale_len = self.scale.len();
        match self.tracks.get_mut(track) {
            Some(t) => t.set_step(step, value, scale_len),
            None => false,
        }
    }

    pub fn cycle_cell(&mut self, track: usize, step: usize) {
        let scale_len = self.scale.len();
        if let Some(t) = self.tracks.get_mut(track) {
            t.cycle_cell(step, scale_len);
        }
    }

    pub fn decrease_cell(&mut self, track: usize, step: usize) {
        if let Some(t) = self.tracks.get_mut(track) {
            t.decrease_cell(step);
        }
    }

    pub fn bump_velocity(&mut self, track: usize, step: usize) {
        let scale_len = self.scale.len();
        if let Some(t) = self.tracks.get_mut(track) {
            t.bump_velocity(step, scale_len);
        }
    }

    pub fn adjust_register(&mut self, track: usize, delta: i32) {
        let scale_len = self.scale.len();
        if let Some(t) = self.tracks.get_mut(track) {
            t.adjust_register(delta, scale_len);
        }
    }

    /// Resize every track in place. Returns the clamped length.
    pub fn set_pattern_length(&mut self, length: usize) -> usize {
        let length = length.clamp(MIN_PATTERN_LENGTH, MAX_PATTERN_LENGTH);
        self.pattern_length = length;
        let scale_len = self.scale.len();
        for track in &mut self.tracks {
            track.resize(length, scale_len);
        }
        length
    }

    /// Regenerate the scale and re-fit every track to it
    pub fn set_scale(&mut self, root: &str, mode: ScaleMode) {
        self.scale = Scale::new(root, mode, self.scale.start_octave, self.scale.octaves);
        let scale_len = self.scale.len();
        for track in &mut self.tracks {
            track.clamp_to_scale(scale_len);
        }
    }

    pub fn randomize_scale<R: Rng>(&mut self, rng: &mut R) {
        let root = NOTE_NAMES[rng.gen_range(0..NOTE_NAMES.len())];
        let mode = ScaleMode::ALL[rng.gen_range(0..ScaleMode::ALL.len())];
        self.set_scale(root, mode);
    }

    pub fn randomize_pattern<R: Rng>(&mut self, rng: &mut R) {
        let scale_len = self.scale.len();
        for track in &mut self.tracks {
            track.randomize(scale_len, rng);
        }
    }

    pub fn clear_pattern(&mut self) {
        for track in &mut self.tracks {
            track.clear();
        }
    }

    pub fn track_for_key(&self, key: char) -> Option<usize> {
        let key = key.to_ascii_uppercase();
        self.tracks.iter().position(|t| t.key == Some(key))
    }

    /// Put a decoded sample on the selected sample track, else the first sample track, else a
    /// new sample track. The target is renamed and selected.
    pub fn load_sample(&mut self, buffer: SampleBuffer, name: &str) -> Option<usize> {
        let target = match self.tracks.get(self.selected) {
            Some(t) if t.kind == TrackKind::Sample => Some(self.selected),
            _ => self.tracks.iter().position(|t| t.kind == TrackKind::Sample),
        };
        let index = match target {
            Some(index) => index,
            None => self.add_track("samplePad")?,
        };
        let track = &mut self.tracks[index];
        track.sample = Some(buffer);
        track.name = name.to_string();
        self.selected = index;
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn project() -> Project {
        let mut p = Project::new(16, Scale::new("C", ScaleMode::Minor, 2, 4));
        for id in ["pulseLead", "chipKick", "chipHat"] {
            p.add_track(id).unwrap();
        }
        p
    }

    fn note(note_index: usize, velocity: u8) -> StepValue {
        StepValue::Note(NoteStep {
            note_index,
            velocity,
        })
    }

    #[test]
    fn test_window_bounds() {
        assert_eq!(window_bounds(29, 6, 14), (6, 20));
        assert_eq!(window_bounds(29, 40, 14), (15, 29));
        assert_eq!(window_bounds(5, 2, 12), (0, 5));
        assert_eq!(window_bounds(0, 2, 12), (0, 0));
        assert_eq!(window_bounds(10, 3, 0), (3, 4));
    }

    #[test]
    fn test_keys_assigned_from_pool() {
        let mut p = project();
        let keys: Vec<_> = p.tracks().iter().map(|t| t.key).collect();
        assert_eq!(keys, vec![Some('Q'), Some('A'), Some('D')]);
        p.add_track("pulseLead").unwrap();
        assert_eq!(p.tracks()[3].key, Some('W'));
        assert_eq!(p.track_for_key('w'), Some(3));
    }

    #[test]
    fn test_add_selects_and_remove_adjusts() {
        let mut p = project();
        assert_eq!(p.selected(), 2);
        assert!(p.add_track("nope").is_none());
        p.remove_track(2).unwrap();
        assert_eq!(p.selected(), 1);
        assert!(p.remove_track(9).is_none());
    }

    #[test]
    fn test_resize_preserves_steps() {
        let mut p = project();
        p.set_step_value(0, 3, note(4, 3));
        p.set_step_value(0, 12, note(2, 1));
        p.set_step_value(1, 5, StepValue::Level(2));
        p.set_step_value(1, 15, StepValue::Level(3));

        p.set_pattern_length(8);
        assert_eq!(p.tracks()[0].steps().len(), 8);
        p.set_pattern_length(16);

        let lead = &p.tracks()[0];
        assert_eq!(lead.steps().len(), 16);
        assert_eq!(
            lead.hit(3),
            Some(Hit {
                velocity: 3,
                note_index: Some(4)
            })
        );
        assert_eq!(lead.hit(12), None);
        assert_eq!(p.tracks()[1].hit(5).map(|h| h.velocity), Some(2));
        assert_eq!(p.tracks()[1].hit(15), None);
    }

    #[test]
    fn test_pattern_length_clamped() {
        let mut p = project();
        assert_eq!(p.set_pattern_length(0), 1);
        assert_eq!(p.set_pattern_length(500), 64);
        assert!(p.tracks().iter().all(|t| t.steps().len() == 64));
    }

    #[test]
    fn test_set_step_values_are_clamped() {
        let mut p = project();
        assert!(p.set_step_value(0, 0, note(99, 9)));
        assert_eq!(
            p.tracks()[0].hit(0),
            Some(Hit {
                velocity: 3,
                note_index: Some(13)
            })
        );
        assert!(p.set_step_value(1, 0, StepValue::Level(7)));
        assert_eq!(p.tracks()[1].hit(0).map(|h| h.velocity), Some(3));
        // wrong kind or out of range
        assert!(!p.set_step_value(1, 0, note(1, 1)));
        assert!(!p.set_step_value(0, 0, StepValue::Level(1)));
        assert!(!p.set_step_value(0, 16, StepValue::Off));
    }

    #[test]
    fn test_cycle_cell_drum() {
        let mut p = project();
        let levels: Vec<u8> = (0..5)
            .map(|_| {
                p.cycle_cell(1, 0);
                p.tracks()[1].hit(0).map(|h| h.velocity).unwrap_or(0)
            })
            .collect();
        assert_eq!(levels, vec![1, 2, 3, 0, 1]);
    }

    #[test]
    fn test_cycle_cell_melodic_walks_window() {
        let mut p = project();
        // pulseLead: window of 14 notes, preview note 4
        p.cycle_cell(0, 0);
        assert_eq!(
            p.tracks()[0].hit(0),
            Some(Hit {
                velocity: 2,
                note_index: Some(4)
            })
        );
        p.set_step_value(0, 0, note(13, 2));
        p.cycle_cell(0, 0);
        assert_eq!(p.tracks()[0].hit(0), None);
    }

    #[test]
    fn test_decrease_cell() {
        let mut p = project();
        p.set_step_value(0, 1, note(1, 2));
        p.decrease_cell(0, 1);
        assert_eq!(p.tracks()[0].hit(1).and_then(|h| h.note_index), Some(0));
        p.decrease_cell(0, 1);
        assert_eq!(p.tracks()[0].hit(1), None);
        p.decrease_cell(1, 1);
        assert_eq!(p.tracks()[1].hit(1), None);
    }

    #[test]
    fn test_bump_velocity_cycles() {
        let mut p = project();
        let mut seen = Vec::new();
        for _ in 0..4 {
            p.bump_velocity(0, 2);
            seen.push(p.tracks()[0].hit(2).map(|h| h.velocity).unwrap_or(0));
        }
        assert_eq!(seen, vec![1, 2, 3, 1]);
        p.bump_velocity(1, 2);
        assert_eq!(p.tracks()[1].hit(2).map(|h| h.velocity), Some(1));
    }

    #[test]
    fn test_adjust_register_clamps_offset() {
        let mut p = project();
        let scale_len = p.scale().len();
        assert_eq!(scale_len, 29);
        p.adjust_register(0, 2);
        assert_eq!(p.tracks()[0].note_offset, 8);
        for _ in 0..10 {
            p.adjust_register(0, 2);
        }
        assert_eq!(p.tracks()[0].note_offset, 15);
        for _ in 0..10 {
            p.adjust_register(0, -2);
        }
        assert_eq!(p.tracks()[0].note_offset, 0);
        assert_eq!(p.window(0).len(), 14);
    }

    #[test]
    fn test_invalid_root_disables_notes() {
        let mut p = project();
        p.set_step_value(0, 0, note(3, 2));
        p.set_scale("X", ScaleMode::Major);
        assert!(p.scale().is_empty());
        assert_eq!(p.tracks()[0].hit(0), None);
        p.cycle_cell(0, 0);
        assert_eq!(p.tracks()[0].hit(0), None);
        assert!(!p.set_step_value(0, 0, note(0, 1)));
        // drums are unaffected
        assert!(p.set_step_value(1, 0, StepValue::Level(1)));
    }

    #[test]
    fn test_scale_change_reclamps_notes() {
        let mut p = project();
        p.set_step_value(0, 0, note(13, 2));
        // pentatonic over 4 octaves: 21 notes, window [6, 20)
        p.set_scale("C", ScaleMode::Pentatonic);
        assert_eq!(p.scale().len(), 21);
        assert_eq!(p.tracks()[0].hit(0).and_then(|h| h.note_index), Some(13));
        p.tracks[0].note_span = 4;
        p.set_scale("C", ScaleMode::Chip);
        assert_eq!(p.tracks()[0].hit(0).and_then(|h| h.note_index), Some(3));
    }

    #[test]
    fn test_solo_overrides_mute() {
        let mut p = project();
        p.toggle_mute(0);
        assert!(!p.is_audible(0));
        assert!(p.is_audible(1));
        p.toggle_solo(1);
        assert!(!p.is_audible(0));
        assert!(p.is_audible(1));
        assert!(!p.is_audible(2));
        p.toggle_solo(0);
        assert!(!p.tracks()[0].muted);
        assert!(p.is_audible(0));
        // Muting after soloing wins
        p.toggle_mute(0);
        assert!(p.tracks()[0].soloed);
        assert!(!p.is_audible(0));
        assert!(p.is_audible(1));
    }

    #[test]
    fn test_randomize_and_clear() {
        let mut p = project();
        let mut rng = StdRng::seed_from_u64(11);
        p.randomize_pattern(&mut rng);
        for track in p.tracks() {
            for step in 0..16 {
                if let Some(hit) = track.hit(step) {
                    assert!((1..=3).contains(&hit.velocity));
                    if let Some(idx) = hit.note_index {
                        assert!(idx < 14);
                    }
                }
            }
        }
        p.clear_pattern();
        assert!(p.tracks().iter().all(|t| (0..16).all(|s| t.hit(s).is_none())));
    }

    #[test]
    fn test_randomize_scale_picks_valid_scale() {
        let mut p = project();
        let mut rng = StdRng::seed_from_u64(5);
        p.randomize_scale(&mut rng);
        assert!(!p.scale().is_empty());
        assert!(NOTE_NAMES.contains(&p.scale().root.as_str()));
    }

    #[test]
    fn test_load_sample_targets() {
        let mut p = project();
        let buf = SampleBuffer::new(vec![0.0; 10], 44100);
        let first = p.load_sample(buf.clone(), "boom").unwrap();
        assert_eq!(first, 3);
        assert_eq!(p.tracks()[3].name, "boom");
        assert_eq!(p.tracks()[3].kind, TrackKind::Sample);
        p.select_track(0);
        assert_eq!(p.load_sample(buf, "clap"), Some(3));
        assert_eq!(p.tracks().len(), 4);
        assert_eq!(p.selected(), 3);
    }

    #[test]
    fn test_arp_pool_skips_every_other_note() {
        let p = {
            let mut p = Project::new(16, Scale::new("C", ScaleMode::Major, 2, 4));
            p.add_track("arpRunner").unwrap();
            p
        };
        let window = p.window(0);
        let pool = p.tracks()[0].arp_pool(window, 0);
        assert_eq!(pool.len(), 4);
        assert_eq!(pool[0], window[0].frequency_hz as f32);
        assert_eq!(pool[1], window[2].frequency_hz as f32);
        let tail = p.tracks()[0].arp_pool(window, window.len() - 1);
        assert_eq!(tail.len(), 1);
    }

    #[test]
    fn test_params_override_defaults() {
        let params = TrackParams {
            decay: Some(0.2),
            gain: Some(0.3),
            ..TrackParams::EMPTY
        };
        let tone = params.tone(Waveform::Square, 220.0);
        assert_eq!(tone.decay, 0.2);
        assert_eq!(tone.gain, 0.3);
        assert_eq!(tone.attack, ToneParams::square(220.0).attack);
        let noise = params.noise();
        assert_eq!(noise.highpass_hz, 200.0);
        assert_eq!(params.drum().base_freq, 55.0);
        assert_eq!(params.sample().playback_rate, 1.0);
    }
}
