//! Outbound delivery channels used to push data outside the platform.

pub mod webhook;
