// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI subcommands.

mod check;
mod convert;
mod deps;
mod info;
mod schema;

pub use check::CheckCmd;
pub use convert::ConvertArgs;
pub use deps::DepsCmd;
pub use info::InfoCmd;
pub use schema::SchemaCmd;
