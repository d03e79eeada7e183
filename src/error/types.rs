use serde::Serialize;

use crate::error::ErrorKind;

/// The single banner message held in the store's error slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNotice {
    pub code: i32,
    pub kind: ErrorKind,
    pub message: String,
}
