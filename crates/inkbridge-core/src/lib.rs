//! Shared types for the inkbridge relay: connection ids, roles, planar
//! geometry, inverse kinematics, text glyphs and the wire protocol.

pub mod errors;
pub mod geometry;
pub mod glyphs;
pub mod ids;
pub mod kinematics;
pub mod role;
pub mod wire;

pub use errors::{DecodeError, GeometryError};
pub use geometry::{ArmGeometry, LinkVector, Point, Stroke, WorkspaceBounds};
pub use ids::ConnectionId;
pub use kinematics::{JointAngles, JointCommand, Translator};
pub use role::Role;
pub use wire::{Frame, Inbound, NoticeKind, Outbound, SystemNotice, TextRequest};
