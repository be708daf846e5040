// SPDX-FileCopyrightText: 2026 Gracehold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the capture-job queue and dead-letter list.

pub mod dead_letter;
pub mod jobs;
