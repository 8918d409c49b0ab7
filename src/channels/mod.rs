//! Publishing channels.
//!
//! Each channel owns its provider protocol end to end; callers pass
//! credentials explicitly and get plain result values back.

pub mod tiktok;
