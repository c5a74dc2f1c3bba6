//! SocialHub domain core.
//!
//! Shared types, the domain error, and the automation rule domain
//! (rules, triggers, conditions, actions, execution records). Everything in
//! this crate is pure logic with no database or network access.

pub mod automation;
pub mod error;
pub mod paging;
pub mod types;
