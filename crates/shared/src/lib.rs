pub mod action;
pub mod domain;
pub mod error;

pub use action::{decode_frame, encode_frame, Action};
pub use domain::{ConnectionStatus, SectionId};
pub use error::FrameError;
