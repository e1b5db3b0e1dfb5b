//! vSphere SOAP (VIM) transport.
//!
//! Implements the collector's source traits over the `/sdk` SOAP endpoint:
//! session login, `RetrievePropertiesEx` property retrieval, the
//! authorization manager and the user directory. Property values arrive as
//! loosely typed XML and are decoded into the collector's [`PropValue`]
//! shape.
//!
//! [`PropValue`]: vhound_collector::types::PropValue

pub mod client;
pub mod config;
mod soap;

pub use client::VimClient;
pub use config::VimConfig;
