//! Browser session handling for Kiosko.
//!
//! Builds WebDriver capability maps from [`kiosko_common::CapabilityDescriptor`],
//! wraps remote (cloud grid) and local driver connections behind the
//! [`session::BrowserSession`] trait, and reports final session status back
//! to the provider.

pub mod caps;
pub mod remote;
pub mod report;
pub mod session;
