// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod command;
pub mod kernel;

pub use command::Command;
pub use kernel::RegistryState;
