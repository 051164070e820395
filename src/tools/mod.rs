//! Native tool invocations used while laying out partitions.
//!
//! Each helper builds a command line and hands it to
//! [`NativeDispatcher`](crate::NativeDispatcher), so the tool is taken from
//! the native sysroot and a missing tool names its recipe.

pub mod mkfs;
pub mod mtools;
