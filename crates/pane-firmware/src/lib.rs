//! ESP32-S3 firmware-specific modules for pane
//!
//! This crate contains the code that only builds for the device: the HTTP
//! transport over embassy-net, the panel sink that buffers frames in RAM
//! before pushing them over SPI, the Wi-Fi connection loop, and the settings
//! baked in at build time.

#![no_std]

extern crate alloc;

pub mod http;
pub mod panel;
pub mod settings;
pub mod wifi;
