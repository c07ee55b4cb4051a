use crate::diagnostic::Location;
use crate::token::Attribute;

/// Errors that abort a compile or a match call.
///
/// Everything else the engine can recover from is reported as a warning
/// in a `Diagnostics` sink instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("id `{id}` defined twice")]
    DuplicateId {
        id: String,
        location: Option<Location>,
    },

    #[error("bad match distance `{0}` (expected All, Longest or Shortest)")]
    BadPolicy(String),

    #[error("match distance `All` requires overlapping matches")]
    AllRequiresOverlapping,

    #[error("token {token} cannot be encoded: its {attribute} contains a reserved separator")]
    Unencodable { token: usize, attribute: Attribute },

    #[error("pattern does not compile: {0}")]
    Automaton(String),
}
