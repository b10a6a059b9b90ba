// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing pipeline — the battery of enhancement and binarization
// transforms tried when the readers fail on the original image.

pub mod enhance;

pub use enhance::{Transform, standard_battery};
