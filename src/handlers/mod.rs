//! Event handling for a shared snippet page
//!
//! - **`resolution`**: link-to-snippet state machine with stale-lookup protection
//! - **`engagement`**: view/like counting and copy-to-clipboard
//! - **`clipboard`**: clipboard port and its adapters

pub mod clipboard;
pub mod engagement;
pub mod resolution;
