pub mod lifecycle;

pub use lifecycle::{CloseReason, TransportState};
