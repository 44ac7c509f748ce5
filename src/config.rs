// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants.

/// Version of the registry event language. Bumped whenever `RegistryEvent` changes shape.
pub const KERNEL_VERSION: u32 = 1;

/// Version of the encoded `RegistryState` carried inside snapshots.
pub const STATE_SCHEMA_VERSION: u32 = 1;
