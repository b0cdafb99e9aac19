// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Public node kinds (spec §4.8): `Var`, `Lift`, `Merge`, `Filter`, `Map`,
//! `Fold`, `Observer`, plus the `switch` combinator (spec §9's "`Lift` that
//! switches which upstream signal it reads"). Each is "data plus a pure tick
//! function" — a single struct implementing [`crate::graph::NodeKind`] —
//! directly grounded in the teacher's one-struct-one-behavior processor
//! layout (`backends::local::processors::*`).

pub mod event_source;
pub mod filter;
pub mod fold;
pub mod handle;
pub mod lift;
pub mod map;
pub mod merge;
pub mod observe;
pub mod switch;
pub mod var;
