//! # resus Core Library
//!
//! This library provides the state machine behind the resus cardiac-arrest
//! checklist: an append-only record of clinical events, the stopwatches derived
//! from it, protocol reminders and attention cues. Presentation (the CLI, or
//! any GUI) is a thin layer that calls into a [`Case`] and renders its output.
//!
//! ## Architecture
//!
//! - **Event log**: ordered, immutable record of the case
//! - **Timers**: case, post-shock, CPR-cycle and ROSC count-up timers driven by
//!   recorded events
//! - **Guideline scheduler**: a 1 Hz state machine that fires time-boxed advisories
//! - **Attention signal**: staleness flags recomputed after every append and tick
//!
//! Nothing runs on its own thread: the caller invokes [`Case::tick`] once per
//! second and every other call is synchronous.
//!
//! ## Key Components
//!
//! - [`Case`]: lifecycle root owning everything below
//! - [`EventLog`]: append-only event record
//! - [`TimerSet`]: the four timers and their trigger policy
//! - [`GuidelineScheduler`]: advisory scheduling
//! - [`AttentionSignal`]: per-control attention flags
//! - [`Config`]: protocol intervals and thresholds

pub mod attention;
pub mod case;
pub mod error;
pub mod events;
pub mod guideline;
pub mod log;
pub mod review;
pub mod storage;
pub mod summary;
pub mod timer;

pub use attention::{AttentionFlags, AttentionSignal, Control, StalenessRule};
pub use case::{Case, CasePhase, EnergySetting, Recorded, TickReport, TimerCommand};
pub use error::{ConfigError, CoreError};
pub use events::{Event, EventId, EventKind, PatientOutcome, Rhythm, Stamp, Waveform};
pub use guideline::{Advisory, AdvisoryKind, GuidelineScheduler, SchedulerState};
pub use log::EventLog;
pub use review::{review, Deviation, DeviationReason};
pub use storage::Config;
pub use summary::{format_clock, CaseSummary};
pub use timer::{TimerKind, TimerSet, TimerState};
