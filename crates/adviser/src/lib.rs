pub mod assistants;
pub mod errors;
pub mod models;
pub mod protocol;
pub mod relay;
pub mod render;
pub mod streamable;
pub mod surface;
