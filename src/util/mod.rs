//! Shared utilities.

pub mod qname;
pub mod slotlist;
