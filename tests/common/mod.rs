// Test helpers are shared across several test binaries and not every binary
// uses every helper.
#![allow(dead_code)]

pub mod cli;
