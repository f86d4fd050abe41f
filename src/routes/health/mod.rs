mod handler;

pub use handler::{health, services};
