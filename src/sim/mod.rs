//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (entity list order)
//! - No rendering, audio or platform dependencies (audio leaves as commands)

pub mod clock;
pub mod collision;
pub mod cone;
pub mod engine;
pub mod entity;
pub mod fsm;
pub mod grid;
pub mod path;
pub mod progression;
pub mod snapshot;

pub use clock::{Period, SimClock};
pub use collision::{Contact, Interaction, InteractionTable, Outcome, Shape, overlaps};
pub use cone::Cone;
pub use engine::{Game, Removal, Simulation, TickCtx, TickInput, Tuning};
pub use entity::{Entity, EntityId, EntityKind, EntityState, Motion, Particle, World};
pub use fsm::{Countdown, Transition, fire};
pub use grid::{Direction, Grid};
pub use path::{CubicSegment, Path, PathBuilder, PathCursor, PathPattern};
pub use progression::{Phase, PlayerSlot, PlayerStatus, Scaling, ScoreSession};
pub use snapshot::{EntityView, Snapshot};
