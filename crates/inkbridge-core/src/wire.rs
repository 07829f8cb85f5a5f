//! JSON text-frame protocol spoken with the operator and the arm.
//!
//! Inbound frames are decoded once, at the boundary, into [`Inbound`]. Every
//! outbound message is built from [`Outbound`] and rendered into a [`Frame`].

use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::DecodeError;
use crate::geometry::{Point, Stroke};
use crate::glyphs;
use crate::kinematics::{JointAngles, JointCommand};
use crate::role::Role;

pub const ID_ARM: &str = "ARM";
pub const ID_CLIENT: &str = "CLIENT";
pub const ID_DRAWING: &str = "DRAWING";
pub const ID_CLEAR: &str = "CLEAR";
pub const ID_TEXT: &str = "TEXT";
pub const ID_SYSTEM: &str = "SYSTEM";

pub const MSG_MOVE: &str = "Move to calculated angles";
pub const MSG_PEN_UP: &str = "Pen up";
pub const MSG_ARM_CONNECTED: &str = "ARM connected";
pub const MSG_ARM_DISCONNECTED: &str = "ARM disconnected";
pub const MSG_CLIENT_CONNECTED: &str = "Client connected";
pub const MSG_CANVAS_CLEARED: &str = "Canvas cleared";

/// Longest text accepted in one `TEXT` message, in characters.
pub const MAX_TEXT_CHARS: usize = 256;

/// A decoded inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// The sender declares its role.
    Identify(Role),
    /// One batch of strokes, in drawing order.
    Drawing(Vec<Stroke>),
    /// The operator cleared its canvas.
    Clear,
    /// Text to be written with the glyph table.
    Text(TextRequest),
    /// Well-formed JSON with an `id` nobody handles.
    Unknown(String),
}

impl Inbound {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Identify(_) => "identify",
            Self::Drawing(_) => "drawing",
            Self::Clear => "clear",
            Self::Text(_) => "text",
            Self::Unknown(_) => "unknown",
        }
    }
}

#[derive(Deserialize)]
struct StrokePayload {
    points: Vec<f64>,
}

/// A validated `TEXT` request.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRequest {
    pub text: String,
    /// Pen start of the first cell; the relay picks one when absent.
    pub origin: Option<Point>,
    /// Glyph units per operator unit.
    pub scale: f64,
}

#[derive(Deserialize)]
struct TextPayload {
    text: String,
    #[serde(default)]
    origin: Option<[f64; 2]>,
    #[serde(default = "default_scale")]
    scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// Decode one text frame.
///
/// Bare `ARM` / `CLIENT` text frames are accepted as identification.
pub fn decode(frame: &str) -> Result<Inbound, DecodeError> {
    match frame.trim() {
        ID_ARM => return Ok(Inbound::Identify(Role::Arm)),
        ID_CLIENT => return Ok(Inbound::Identify(Role::Operator)),
        _ => {}
    }

    let value: Value =
        serde_json::from_str(frame).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingId)?;

    match id {
        ID_ARM => Ok(Inbound::Identify(Role::Arm)),
        ID_CLIENT => Ok(Inbound::Identify(Role::Operator)),
        ID_CLEAR => Ok(Inbound::Clear),
        ID_DRAWING => decode_drawing(value.get("data").cloned().unwrap_or(Value::Null)),
        ID_TEXT => decode_text(value.get("data").cloned().unwrap_or(Value::Null)),
        other => Ok(Inbound::Unknown(other.to_string())),
    }
}

fn decode_drawing(data: Value) -> Result<Inbound, DecodeError> {
    let payload: Vec<StrokePayload> =
        serde_json::from_value(data).map_err(|e| DecodeError::InvalidPayload {
            id: ID_DRAWING,
            detail: e.to_string(),
        })?;

    payload
        .into_iter()
        .enumerate()
        .map(|(index, stroke)| {
            if stroke.points.iter().any(|v| !v.is_finite()) {
                return Err(DecodeError::NonFiniteCoordinate { stroke: index });
            }
            Stroke::from_flat(&stroke.points).ok_or(DecodeError::OddCoordinates {
                stroke: index,
                len: stroke.points.len(),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Inbound::Drawing)
}

fn decode_text(data: Value) -> Result<Inbound, DecodeError> {
    let invalid = |detail: String| DecodeError::InvalidPayload { id: ID_TEXT, detail };

    let payload: TextPayload = serde_json::from_value(data).map_err(|e| invalid(e.to_string()))?;
    let chars = payload.text.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(invalid(format!("text has {chars} characters, limit is {MAX_TEXT_CHARS}")));
    }
    if !(payload.scale.is_finite() && payload.scale > 0.0) {
        return Err(invalid("scale must be a positive number".into()));
    }
    let origin = payload.origin.map(|[x, y]| Point::new(x, y));
    if origin.is_some_and(|p| !p.is_finite()) {
        return Err(invalid("origin must be finite".into()));
    }
    if let Some(ch) = payload.text.chars().find(|&ch| !glyphs::is_writable(ch)) {
        return Err(DecodeError::UnsupportedCharacter(ch));
    }

    Ok(Inbound::Text(TextRequest {
        text: payload.text,
        origin,
        scale: payload.scale,
    }))
}

/// Category of a lifecycle or error notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Connected,
    Disconnected,
    Info,
    Error,
}

/// Ephemeral human-readable notice. Sent, never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct SystemNotice {
    pub kind: NoticeKind,
    pub message: String,
}

impl SystemNotice {
    pub fn arm_connected() -> Self {
        Self::new(NoticeKind::Connected, MSG_ARM_CONNECTED)
    }

    pub fn arm_disconnected() -> Self {
        Self::new(NoticeKind::Disconnected, MSG_ARM_DISCONNECTED)
    }

    pub fn client_connected() -> Self {
        Self::new(NoticeKind::Connected, MSG_CLIENT_CONNECTED)
    }

    pub fn canvas_cleared() -> Self {
        Self::new(NoticeKind::Info, MSG_CANVAS_CLEARED)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }

    fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Anything the relay sends to a peer.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    Command(JointCommand),
    Notice(SystemNotice),
    /// Angles computed for an operator point, reported back to the operator.
    Echo { point: Point, angles: JointAngles },
}

/// A rendered outbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Json(Value),
    Text(String),
}

impl Outbound {
    pub fn render(&self) -> Frame {
        match self {
            Self::Command(JointCommand::Move(angles)) => Frame::Json(json!({
                "id": ID_ARM,
                "message": MSG_MOVE,
                "data": { "theta1": angles.theta1, "theta2": angles.theta2, "pen": true },
            })),
            Self::Command(JointCommand::PenUp) => Frame::Json(json!({
                "id": ID_ARM,
                "message": MSG_PEN_UP,
                "data": { "pen": false },
            })),
            Self::Notice(notice) if notice.kind == NoticeKind::Error => {
                Frame::Text(format!("Error: {}", notice.message))
            }
            Self::Notice(notice) => Frame::Json(json!({
                "id": ID_SYSTEM,
                "message": notice.message,
            })),
            Self::Echo { point, angles } => Frame::Json(json!({
                "id": ID_SYSTEM,
                "message": format!("Calculated angles for ({}, {})", point.x, point.y),
                "data": { "theta1": angles.theta1, "theta2": angles.theta2 },
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_arm_identify() {
        assert_eq!(decode(r#"{"id":"ARM"}"#).unwrap(), Inbound::Identify(Role::Arm));
    }

    #[test]
    fn decode_bare_text_identify() {
        assert_eq!(decode("ARM").unwrap(), Inbound::Identify(Role::Arm));
        assert_eq!(decode(" CLIENT\n").unwrap(), Inbound::Identify(Role::Operator));
    }

    #[test]
    fn decode_client_identify() {
        assert_eq!(
            decode(r#"{"id":"CLIENT"}"#).unwrap(),
            Inbound::Identify(Role::Operator)
        );
    }

    #[test]
    fn decode_drawing_batch() {
        let msg = decode(r#"{"id":"DRAWING","data":[{"points":[0,7,1.5,2]},{"points":[]}]}"#).unwrap();
        let Inbound::Drawing(strokes) = msg else {
            panic!("expected drawing, got {msg:?}");
        };
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0].points(), &[Point::new(0.0, 7.0), Point::new(1.5, 2.0)]);
        assert!(strokes[1].is_empty());
    }

    #[test]
    fn decode_drawing_odd_coordinates() {
        let err = decode(r#"{"id":"DRAWING","data":[{"points":[1,2]},{"points":[1,2,3]}]}"#).unwrap_err();
        assert_eq!(err, DecodeError::OddCoordinates { stroke: 1, len: 3 });
    }

    #[test]
    fn decode_drawing_missing_data() {
        let err = decode(r#"{"id":"DRAWING"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPayload { id: "DRAWING", .. }), "{err:?}");
    }

    #[test]
    fn decode_drawing_bad_points() {
        let err = decode(r#"{"id":"DRAWING","data":[{"points":["a"]}]}"#).unwrap_err();
        assert_eq!(err.error_kind(), "invalid_payload");
    }

    #[test]
    fn decode_text_defaults() {
        let msg = decode(r#"{"id":"TEXT","data":{"text":"Hi!"}}"#).unwrap();
        assert_eq!(
            msg,
            Inbound::Text(TextRequest {
                text: "Hi!".into(),
                origin: None,
                scale: 1.0,
            })
        );
    }

    #[test]
    fn decode_text_with_placement() {
        let msg = decode(r#"{"id":"TEXT","data":{"text":"A","origin":[-4,6],"scale":0.5}}"#).unwrap();
        let Inbound::Text(req) = msg else { panic!("expected text, got {msg:?}") };
        assert_eq!(req.origin, Some(Point::new(-4.0, 6.0)));
        assert_eq!(req.scale, 0.5);
    }

    #[test]
    fn decode_text_rejects_unwritable_character() {
        let err = decode(r#"{"id":"TEXT","data":{"text":"a~b"}}"#).unwrap_err();
        assert_eq!(err, DecodeError::UnsupportedCharacter('~'));
    }

    #[test]
    fn decode_text_rejects_bad_scale_and_length() {
        let err = decode(r#"{"id":"TEXT","data":{"text":"A","scale":0}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPayload { id: "TEXT", .. }), "{err:?}");

        let long = "A".repeat(MAX_TEXT_CHARS + 1);
        let err = decode(&format!(r#"{{"id":"TEXT","data":{{"text":"{long}"}}}}"#)).unwrap_err();
        assert_eq!(err.error_kind(), "invalid_payload");
    }

    #[test]
    fn decode_clear() {
        assert_eq!(decode(r#"{"id":"CLEAR"}"#).unwrap(), Inbound::Clear);
    }

    #[test]
    fn decode_unknown_id() {
        assert_eq!(
            decode(r#"{"id":"DANCE"}"#).unwrap(),
            Inbound::Unknown("DANCE".into())
        );
    }

    #[test]
    fn decode_invalid_json() {
        let err = decode("{not json").unwrap_err();
        assert_eq!(err.error_kind(), "invalid_json");
    }

    #[test]
    fn decode_missing_id() {
        assert_eq!(decode(r#"{"data":[]}"#).unwrap_err(), DecodeError::MissingId);
        assert_eq!(decode(r#"{"id":5}"#).unwrap_err(), DecodeError::MissingId);
        assert_eq!(decode("[1,2]").unwrap_err(), DecodeError::MissingId);
    }

    #[test]
    fn render_move_command() {
        let frame = Outbound::Command(JointCommand::Move(JointAngles { theta1: -41.86, theta2: 69.08 })).render();
        let Frame::Json(value) = frame else { panic!("expected json") };
        assert_eq!(value["id"], "ARM");
        assert_eq!(value["message"], "Move to calculated angles");
        assert_eq!(value["data"]["theta1"], -41.86);
        assert_eq!(value["data"]["theta2"], 69.08);
        assert_eq!(value["data"]["pen"], true);
    }

    #[test]
    fn render_pen_up() {
        let Frame::Json(value) = Outbound::Command(JointCommand::PenUp).render() else {
            panic!("expected json")
        };
        assert_eq!(value, json!({"id":"ARM","message":"Pen up","data":{"pen":false}}));
    }

    #[test]
    fn render_lifecycle_notice() {
        let Frame::Json(value) = Outbound::Notice(SystemNotice::arm_disconnected()).render() else {
            panic!("expected json")
        };
        assert_eq!(value, json!({"id":"SYSTEM","message":"ARM disconnected"}));
    }

    #[test]
    fn render_echo_formats_point() {
        let echo = Outbound::Echo {
            point: Point::new(0.0, 7.5),
            angles: JointAngles { theta1: 1.0, theta2: 2.0 },
        };
        let Frame::Json(value) = echo.render() else { panic!("expected json") };
        assert_eq!(value["message"], "Calculated angles for (0, 7.5)");
        assert_eq!(value["data"], json!({"theta1": 1.0, "theta2": 2.0}));
    }

    #[test]
    fn render_error_is_plain_text() {
        let frame = Outbound::Notice(SystemNotice::error("bad frame")).render();
        assert_eq!(frame, Frame::Text("Error: bad frame".into()));
    }
}
