use serde::{Deserialize, Serialize};

/// Sharp spellings indexed by pitch class (C = 0)
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const FALLBACK_FREQ: f64 = 440.0;
const FALLBACK_MIDI: i32 = 60;

/// Lowest and highest octave a generated scale may start in
pub const MIN_START_OCTAVE: i32 = -1;
pub const MAX_START_OCTAVE: i32 = 9;

/// Longest scale, in octaves
pub const MAX_SCALE_OCTAVES: usize = 10;

/// Pitch class of a note name without octave ("C#", "Eb", ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchClass(u8);

impl PitchClass {
    /// Parse a pitch name. Accepts sharps and flats, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let semitone = match upper.as_str() {
            "C" => 0,
            "C#" | "DB" => 1,
            "D" => 2,
            "D#" | "EB" => 3,
            "E" => 4,
            "F" => 5,
            "F#" | "GB" => 6,
            "G" => 7,
            "G#" | "AB" => 8,
            "A" => 9,
            "A#" | "BB" => 10,
            "B" => 11,
            _ => return None,
        };
        Some(Self(semitone))
    }

    pub fn semitone(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.0 as usize]
    }
}

/// Scale mode with its interval pattern in semitones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    Major,
    Minor,
    Dorian,
    Mixolydian,
    Lydian,
    Phrygian,
    Harmonic,
    Pentatonic,
    Chip,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 9] = [
        ScaleMode::Major,
        ScaleMode::Minor,
        ScaleMode::Dorian,
        ScaleMode::Mixolydian,
        ScaleMode::Lydian,
        ScaleMode::Phrygian,
        ScaleMode::Harmonic,
        ScaleMode::Pentatonic,
        ScaleMode::Chip,
    ];

    pub fn intervals(self) -> &'static [u8] {
        match self {
            ScaleMode::Major => &[2, 2, 1, 2, 2, 2, 1],
            ScaleMode::Minor => &[2, 1, 2, 2, 1, 2, 2],
            ScaleMode::Dorian => &[2, 1, 2, 2, 2, 1, 2],
            ScaleMode::Mixolydian => &[2, 2, 1, 2, 2, 1, 2],
            ScaleMode::Lydian => &[2, 2, 2, 1, 2, 2, 1],
            ScaleMode::Phrygian => &[1, 2, 2, 2, 1, 2, 2],
            ScaleMode::Harmonic => &[2, 1, 2, 2, 1, 3, 1],
            ScaleMode::Pentatonic => &[2, 2, 3, 2, 3],
            ScaleMode::Chip => &[2, 1, 4, 1, 4],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleMode::Major => "major",
            ScaleMode::Minor => "minor",
            ScaleMode::Dorian => "dorian",
            ScaleMode::Mixolydian => "mixolydian",
            ScaleMode::Lydian => "lydian",
            ScaleMode::Phrygian => "phrygian",
            ScaleMode::Harmonic => "harmonic",
            ScaleMode::Pentatonic => "pentatonic",
            ScaleMode::Chip => "chip",
        }
    }

    /// Unknown names fall back to natural minor
    pub fn from_name(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.name() == lower)
            .unwrap_or(ScaleMode::Minor)
    }
}

/// One playable note of a generated scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleNote {
    pub label: String,
    pub frequency_hz: f64,
}

/// MIDI number of "C#4" / "bb-1". None when malformed or outside the i32 range.
fn parse_note(note: &str) -> Option<i32> {
    let note = note.trim();
    let mut chars = note.char_indices();
    let (_, letter) = chars.next()?;
    if !matches!(letter.to_ascii_uppercase(), 'A'..='G') {
        return None;
    }
    let mut pitch_end = letter.len_utf8();
    if let Some((idx, accidental)) = chars.next() {
        if accidental == '#' || accidental == 'b' || accidental == 'B' {
            pitch_end = idx + accidental.len_utf8();
        }
    }
    let pitch = PitchClass::from_name(&note[..pitch_end])?;
    let octave_str = &note[pitch_end..];
    let digits = octave_str.strip_prefix('-').unwrap_or(octave_str);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let octave = octave_str.parse::<i64>().ok()?;
    let midi = octave
        .checked_add(1)?
        .checked_mul(12)?
        .checked_add(pitch.semitone() as i64)?;
    i32::try_from(midi).ok()
}

/// Equal-tempered frequency of a note name. Malformed input yields 440 Hz.
pub fn note_to_frequency(note: &str) -> f64 {
    parse_note(note)
        .map(midi_to_frequency)
        .filter(|f| f.is_finite())
        .unwrap_or(FALLBACK_FREQ)
}

/// MIDI number of a note name. Malformed input yields 60 (C4).
pub fn note_to_midi(note: &str) -> i32 {
    parse_note(note).unwrap_or(FALLBACK_MIDI)
}

/// Note name from MIDI number (60 -> "C4", 61 -> "C#4", -1 -> "B-2")
pub fn midi_to_note_name(midi: i32) -> String {
    let idx = midi.rem_euclid(12) as usize;
    let octave = midi.div_euclid(12) - 1;
    format!("{}{}", NOTE_NAMES[idx], octave)
}

/// Convert MIDI note number to frequency in Hz
pub fn midi_to_frequency(midi: i32) -> f64 {
    440.0 * 2f64.powf((midi as f64 - 69.0) / 12.0)
}

/// Walk the mode's intervals from `root` for `octaves` octaves, closing with one final note.
/// An unknown root produces an empty scale. The start octave and octave count are clamped to
/// `MIN_START_OCTAVE..=MAX_START_OCTAVE` and `MAX_SCALE_OCTAVES`.
pub fn generate_scale(root: &str, mode: &str, start_octave: i32, octaves: usize) -> Vec<ScaleNote> {
    let Some(root) = PitchClass::from_name(root) else {
        return Vec::new();
    };
    generate_scale_for(root, ScaleMode::from_name(mode), start_octave, octaves)
}

pub fn generate_scale_for(
    root: PitchClass,
    mode: ScaleMode,
    start_octave: i32,
    octaves: usize,
) -> Vec<ScaleNote> {
    let start_octave = start_octave.clamp(MIN_START_OCTAVE, MAX_START_OCTAVE);
    let octaves = octaves.min(MAX_SCALE_OCTAVES);
    let intervals = mode.intervals();
    let mut notes = Vec::with_capacity(intervals.len() * octaves + 1);
    let mut midi = (start_octave + 1) * 12 + root.semitone() as i32;

    for _ in 0..octaves {
        for &step in intervals {
            notes.push(scale_note(midi));
            midi += step as i32;
        }
    }
    notes.push(scale_note(midi));
    notes
}

fn scale_note(midi: i32) -> ScaleNote {
    let label = midi_to_note_name(midi);
    let frequency_hz = note_to_frequency(&label);
    ScaleNote {
        label,
        frequency_hz,
    }
}
