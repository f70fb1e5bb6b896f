// src/session/mod.rs

//! Timed exam sessions: the controller, the shared handle the HTTP layer
//! and the expiry observer both drive, and the observer itself.

pub mod controller;
pub mod registry;
pub mod ticker;

pub use controller::{SessionController, SessionServices};
pub use registry::{SessionHandle, SessionMap, SessionRegistry, SubmitTrigger, TickOutcome};
