mod handler;

pub use handler::forward;
