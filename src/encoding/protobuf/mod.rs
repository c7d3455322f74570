// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Protobuf strategy module.
//!
//! Provides text-format ⇄ binary conversion using prost-reflect, in single
//! message and length-delimited stream modes.

pub mod codec;
pub mod stream;

pub use codec::ProtobufStrategy;
