pub mod canvas;
pub mod padding;
pub mod pipeline;
pub mod resize;
pub mod role;
