//! Deterministic, non-repainting market-structure engines.
//!
//! Six cooperating components share a common `Bar` model and emit immutable
//! snapshot objects consumed by the next stage:
//!
//! - [`session`] — session boundary materialization (C1) and per-session
//!   high/low tracking (C2).
//! - [`swing`] — HTF swing detection (C3): confirmed swing highs/lows on H1
//!   and H4, never repainted once confirmed.
//! - [`bos`] — break-of-structure reversal engine (C4): time-bounded
//!   windows anchored to pivots, emitting confidence-scored signals.
//! - [`equilibrium`] — pure premium/discount/equilibrium classification
//!   (C5).
//! - [`plan`] — daily bias planner (C6): bands and ranks levels from C2/C3
//!   into a deterministic `Plan` of up/down price targets.
//!
//! Every engine is constructed from an explicit, plain-data configuration
//! value (see [`config`]) and driven by `start_date -> many on_bar ->
//! end_date`. There is no process-wide mutable state: two engine instances
//! never share interior state, and snapshots handed to callers are deep
//! copies.

pub mod bar;
pub mod bos;
pub mod config;
pub mod equilibrium;
pub mod error;
pub mod math;
pub mod plan;
pub mod range;
pub mod session;
pub mod swing;
pub mod timeframe;

pub use bar::Bar;
pub use bos::{BosDirection, BosEngineState, BosReversalEngine, BosSignal, BosWindow, WindowStatus};
pub use equilibrium::{equilibrium, equilibrium_batch, equilibrium_range, EquilibriumLevel, Zone};
pub use error::{StructureError, StructureResult};
pub use plan::{
    DailyBiasPlanner, Direction, KeyLevel, KeyLevelKind, KeyLevelSource, LevelBand, Plan,
    PlanMeta, PlanTarget, PlanTargetStatus,
};
pub use range::{RangeSource, SwingRange};
pub use session::{SessionBoundary, SessionLevels, SessionLevelsEngine, SessionLevelsSnapshot};
pub use swing::{
    HtfSnapshot, HtfSwingsEngine, HtfSwingsSnapshot, PendingSwing, SwingKind, SwingMetrics,
    SwingPoint,
};
pub use timeframe::Htf;
