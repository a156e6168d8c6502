// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{SecondsFormat, Utc};

/// Current time as a fixed-width RFC3339 string with nanoseconds.
///
/// Fixed width keeps lexicographic order equal to time order, which the
/// order listing relies on for Firestore range filters.
pub fn now_sortable() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}
