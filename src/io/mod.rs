// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Byte-stream plumbing around conversions.

pub mod filter;

pub use filter::{EncodeStream, FilterChain, FilterKind};
