//! # Nanoleaf Control Library for Aurora light panels
//!
//! `nanoleaf-control-lib` is a Rust library for controlling Nanoleaf Aurora controllers over
//! the local network. It finds controllers with SSDP, pairs with them to obtain an auth token,
//! and wraps the controller's REST API in a client whose accessors never fail loudly: every
//! problem is reported to a diagnostic sink and the call returns `None`.
//!
//! ## Features
//!
//! - Device discovery on local networks
//! - Pairing and token management
//! - Power, brightness, hue, saturation, color temperature and RGB color control
//! - Effects, panel layout and rhythm module accessors
//! - Per-panel color streaming over UDP
//!
//! ## Example
//!
//! Here is a simple example of how to find an Aurora, pair with it and turn it on:
//!
//! ```no_run
//! use nanoleaf_control_lib::control_interface::Aurora;
//! use nanoleaf_control_lib::util::auth::Auth;
//! use nanoleaf_control_lib::util::discovery::Discovery;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Search the network for 30 seconds
//!     let devices = Discovery::find_auroras(Duration::from_secs(30)).await;
//!
//!     for device in devices {
//!         // Hold the power button for 5-7 seconds before pairing
//!         if let Some(token) = Auth::pair(&device.address).await {
//!             let aurora = Aurora::from_discovered_device(&device, &token);
//!             aurora.set_on(true).await;
//!         }
//!     }
//! }
//! ```
//!
//! ## Disclaimer
//!
//! This project is not affiliated with, authorized by, endorsed by, or in any way officially connected
//! with Nanoleaf or its affiliates. The official Nanoleaf website can be found at [https://nanoleaf.me](https://nanoleaf.me).
//!
//! ## License
//!
//! This project is dual-licensed under the MIT License and the Apache License, Version 2.0.
//! You may choose to use either license, depending on your project needs.
//! See the `LICENSE-MIT` and `LICENSE-APACHE` files for the full text of the licenses.

// The `control_interface` module holds the `Aurora` client. It sends requests to a paired
// controller, normalizes the status codes it answers with, and exposes state, effects,
// layout and rhythm module accessors.
//
// Example usage:
//
// ```
// use nanoleaf_control_lib::control_interface::Aurora;
//
// #[tokio::main]
// async fn main() {
//     let aurora = Aurora::new("192.168.1.20", "abcdef0123456789");
//     if let Some(level) = aurora.brightness().await {
//         println!("Brightness: {}", level);
//     }
// }
// ```
pub mod control_interface;

// The `led` module contains the color model (RGB samples and the device's HSB units) and the
// UDP stream used to set individual panel colors.
//
// Example usage:
//
// ```
// use nanoleaf_control_lib::led::led_color::{rgb_from_hsb, Hsb};
//
// let green = rgb_from_hsb(Hsb::new(120, 100, 100));
// ```
pub mod led;

// The `util` module provides discovery, pairing, the HTTP transport seam, the error taxonomy
// and the diagnostic sink that the rest of the library reports through.
//
// Example usage:
//
// ```
// use nanoleaf_control_lib::util::discovery::Discovery;
// use std::time::Duration;
//
// #[tokio::main]
// async fn main() {
//     let devices = Discovery::find_auroras(Duration::from_secs(10)).await;
//     Discovery::pretty_print_devices(&devices);
// }
// ```
pub mod util;
