pub mod bus;
pub mod delay;
pub mod drive;
pub mod filter;
pub mod limiter;

pub use bus::{BusProcessor, EffectsBus, EffectsBusState};
pub use delay::{Delay, MAX_DELAY_SECS, MAX_FEEDBACK};
pub use drive::{DriveCurve, WaveShaper, DRIVE_CURVE_POINTS};
pub use filter::{FilterSpec, FilterType, SvfFilter};
pub use limiter::Limiter;
