// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # iltransform
//!
//! Tree rewrites for the IL stage of a .NET decompiler. Given a method already lifted into an
//! instruction tree, the passes in this crate fold away the indirections a C# compiler
//! introduces around the receiver (`this`) and around redundant self-assignments, so later
//! stages see direct code.
//!
//! ## Features
//!
//! - **Arena instruction tree** - Nodes, parent links and variable use-lists kept in step by
//!   every mutation primitive, with a full invariant check in [`il::IlFunction::verify`]
//! - **Match predicates** - Non-mutating `match_*` helpers and structural equality
//! - **Three rewrite passes** - Captured receiver canonicalization, self-store elimination and
//!   receiver alias stripping
//! - **Pluggable inlining** - An [`transforms::InliningEngine`] runs after every removal
//! - **Event log** - Every edit is recorded in a lock-free [`transforms::EventLog`]
//! - **Parallel application** - One pass over many functions with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use iltransform::prelude::*;
//!
//! let widget = IlType::new(Token::new(0x0200_0001), "Demo", "Widget", TypeFlags::empty(), StackType::O);
//! let mut function = IlFunction::new(Token::new(0x0600_0001), "Draw");
//! let this = function.add_variable(VariableKind::This, 0, "this", widget.clone());
//! let alias = function.add_variable(VariableKind::Local, 0, "<>c__CompilerGenerated_this", widget);
//!
//! // stloc alias(ldloc this); ret(ldloc alias)
//! let entry = function.add_block(function.body(), BlockKind::ControlFlow)?;
//! let receiver = function.ld_loc(this);
//! let store = function.st_loc(alias, receiver)?;
//! function.push_instruction(entry, store)?;
//! let load = function.ld_loc(alias);
//! let ret = function.ret(Some(load))?;
//! function.push_instruction(entry, ret)?;
//!
//! let ctx = TransformContext::default();
//! apply(&RemoveCompilerGeneratedThis::new(), &mut function, &ctx)?;
//!
//! assert_eq!(function.instructions(entry), &[ret]);
//! assert_eq!(function.display(ret).to_string(), "ret(ldloc this)");
//! # Ok::<(), iltransform::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`typesystem`] - Declaration identities the passes compare (types, methods, fields)
//! - [`il`] - The instruction tree, its mutation primitives and match predicates
//! - [`transforms`] - The passes, their shared context, the inliner seam and the event log
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result). Pattern mismatches are not
//! errors; a pass that finds nothing to rewrite returns `Ok(())` without touching the tree.

#[macro_use]
pub(crate) mod error;

#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust
/// use iltransform::prelude::*;
///
/// let ctx = TransformContext::new(TransformSettings::default().with_verification(true));
/// assert!(ctx.events.is_empty());
/// ```
pub mod prelude;

pub mod il;
pub mod transforms;
pub mod typesystem;

/// `iltransform` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`]. This is used consistently throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// `iltransform` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the variants.
pub use error::Error;
