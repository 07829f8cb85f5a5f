//! Transport-agnostic relay core: role registry, command emitter and the
//! message router that ties them to the kinematics translator.

pub mod config;
pub mod emitter;
pub mod outbox;
pub mod registry;
pub mod router;
pub mod stroke_log;

pub use config::{BindingPolicy, RelayConfig};
pub use emitter::{CommandEmitter, Emitted, EmitterStats};
pub use outbox::{Outbox, SendError};
pub use registry::RoleRegistry;
pub use router::{DrawProgress, PeerState, RelayEvent, RelayStatus, Router};
pub use stroke_log::StrokeLog;
