#![allow(clippy::too_many_arguments)]

pub mod logger;

pub mod canvas;
pub mod cli;
pub mod error;
pub mod io;
pub mod ops;
pub mod session;
pub mod settings;

pub use canvas::PixelBuffer;
pub use error::EditorError;
pub use session::{EditorSession, EffectKind};
