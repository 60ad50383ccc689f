// SPDX-FileCopyrightText: 2026 Sqlgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared testing utilities for the sqlgate workspace.

pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
