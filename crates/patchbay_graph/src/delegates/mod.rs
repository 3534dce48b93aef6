// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ready-made node delegate sets.

pub mod calculator;
