mod controller;
pub mod protocol;

pub use controller::{
    DetectionController, LiveStatus, StreamConfig, StreamError, StreamEvent, StreamPhase, StreamTicket,
};
pub use protocol::{DetectionMessage, Overlay, OverlayBox, RecognizedStudent};
