//! Timeline normalization and repair.
//!
//! The generator that drafts a timeline is unreliable: its output may be a
//! list of records, a container object wrapping one, or a loosely formatted
//! text dump. This crate turns any of those into a canonical
//! [`TimelineOutput`](shorts_models::TimelineOutput):
//!
//! 1. Resolve the raw draft shape ([`shape`]), falling back to the tolerant
//!    text parser ([`text`]) for textual drafts
//! 2. Validate each candidate segment, dropping invalid ones with a tagged
//!    reason ([`validate`])
//! 3. Sort, clamp segment durations, and repair image/audio coverage
//!    ([`normalize`])
//!
//! The normalizer never fails. Everything it discards is counted in
//! [`RepairDiagnostics`].

pub mod diagnostics;
pub mod metrics;
pub mod normalize;
pub mod resolver;
pub mod shape;
pub mod text;
pub mod validate;

pub use diagnostics::RepairDiagnostics;
pub use normalize::{NormalizedTimeline, NormalizerConfig, TimelineNormalizer};
pub use resolver::{FileResolver, KnownFiles, SearchPathResolver};
pub use shape::{DraftShape, RawTimeline, ResolvedDraft};
pub use text::{normalize_text, parse_timeline_text};
pub use validate::DropReason;
