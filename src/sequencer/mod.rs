pub mod pattern;
pub mod scheduler;
pub mod templates;

pub use pattern::{
    window_bounds, DrumVoice, Hit, NoteStep, Project, Scale, StepValue, Steps, Track, TrackKind,
    TrackParams, DEFAULT_PATTERN_LENGTH, KEY_POOL, MAX_PATTERN_LENGTH, MIN_PATTERN_LENGTH,
};
pub use scheduler::{
    compute_gain, Scheduler, StepEvents, TrackTrigger, TransportState, DEFAULT_BPM,
    DEFAULT_POLL_INTERVAL, DEFAULT_SCHEDULE_AHEAD, MAX_BPM, MIN_BPM,
};
pub use templates::{find_template, TrackTemplate, INITIAL_TRACKS, TEMPLATES};
