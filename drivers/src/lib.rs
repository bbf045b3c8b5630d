#![no_std]
//! Peripheral drivers for the Galaxy A72 handset
//!
//! This library drives the S6E3FC3 AMOLED panel over a MIPI-DSI host, the
//! FTS5CU56A multi-touch controller and the SM5714 charger and fuel gauge
//! over I2C. All hardware access goes through blocking `embedded-hal`
//! traits.

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

/// Register access helpers shared by the I2C drivers.
pub mod register;

/// FTS5CU56A capacitive multi-touch controller driver.
pub mod fts5cu56a;

/// S6E3FC3 AMOLED panel driver.
pub mod s6e3fc3;

/// SM5714 charger and fuel gauge drivers.
pub mod sm5714;

pub use fts5cu56a::blocking::Fts5cu56a;
pub use s6e3fc3::blocking::S6e3fc3;
pub use sm5714::charger::Sm5714Charger;
pub use sm5714::fuel_gauge::Sm5714FuelGauge;
