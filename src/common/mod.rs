// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Common types shared by the pattern compiler and the match engine.

pub mod local_ids;
pub mod symbol;
