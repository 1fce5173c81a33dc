//! Hardware-independent core library for pane
//!
//! This crate contains all platform-agnostic logic for the pane networked
//! display: the page scheduler and the pages it rotates, the frame streaming
//! client, the transport contract both of them fetch through, the button
//! gesture classifier, and the display sink abstraction.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod display;
pub mod input;
pub mod pages;
pub mod stream;
pub mod transport;

#[cfg(test)]
mod test_support;
