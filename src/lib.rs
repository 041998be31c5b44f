#![doc = include_str!("../README.md")]

pub mod content;
mod courier;
pub mod labels;
pub mod message;
pub mod transport;

#[doc(inline)]
pub use content::{ContentKind, FillContent};

#[doc(inline)]
pub use courier::{
    Courier, CourierConfig, CourierHook, DefaultCourierHook, Receipt, SendError, SendErrorKind,
};

#[doc(inline)]
pub use message::Message;

#[doc(inline)]
pub use transport::{Deliver, Transport, TransportError, TransportErrorKind};
