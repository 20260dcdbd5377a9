//! Subsystems built on the core: the template catalog, the provisioning and
//! reset engines with their rename and lockdown steps, and the two host
//! implementations of the gateway traits.

pub mod host;
pub mod lockdown;
pub mod memory;
pub mod provision;
pub mod rename;
pub mod reset;
pub mod template;
