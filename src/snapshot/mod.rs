// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod encode;
pub mod decode;
pub mod blake3;

/// Prefix of every encoded `RegistryState`.
pub const MAGIC: &[u8; 4] = b"WCST";
