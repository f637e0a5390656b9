#![doc = include_str!("../README.md")]

pub mod checksum;
mod directory;
mod enumerate;
mod error;
mod isbn;
mod output;
mod partition;
mod pipeline;
mod validator;

pub use crate::directory::*;
pub use crate::enumerate::*;
pub use crate::error::*;
pub use crate::isbn::*;
pub use crate::output::*;
pub use crate::partition::*;
pub use crate::pipeline::*;
pub use crate::validator::*;
