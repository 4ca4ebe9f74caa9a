#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic)]

pub mod compositor;
pub mod renderer;
pub mod scheduler;
pub mod settings;

pub use renderer::{ClipMode, RasterImage, RenderError, RenderParams, Renderer};
pub use scheduler::{JobHandle, RenderResult, RenderScheduler};
