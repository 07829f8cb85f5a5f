/// Inbound frame could not be turned into a typed message.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("missing or non-string \"id\" field")]
    MissingId,
    #[error("invalid {id} payload: {detail}")]
    InvalidPayload { id: &'static str, detail: String },
    #[error("stroke {stroke} has an odd number of coordinates ({len})")]
    OddCoordinates { stroke: usize, len: usize },
    #[error("stroke {stroke} contains a non-finite coordinate")]
    NonFiniteCoordinate { stroke: usize },
    #[error("no glyph for character {0:?}")]
    UnsupportedCharacter(char),
}

impl DecodeError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "invalid_json",
            Self::MissingId => "missing_id",
            Self::InvalidPayload { .. } => "invalid_payload",
            Self::OddCoordinates { .. } => "odd_coordinates",
            Self::NonFiniteCoordinate { .. } => "non_finite_coordinate",
            Self::UnsupportedCharacter(_) => "unsupported_character",
        }
    }
}

/// Link geometry that cannot describe a 2-link arm.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("link {link} has a non-finite component")]
    NonFinite { link: u8 },
    #[error("link {link} has zero length")]
    ZeroLength { link: u8 },
}
