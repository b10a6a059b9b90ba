// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decode cascade — symbol readers, the strategies that drive them, payload
// text decoding, and the scanner that orders the strategies.

pub mod reader;
pub mod scanner;
pub mod strategy;
pub mod text;

pub use reader::SymbolReader;
pub use scanner::CodeScanner;
pub use strategy::{Attempt, DecodeStrategy, DirectStrategy, PreprocessStrategy, SecondaryStrategy};
