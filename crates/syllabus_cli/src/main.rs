//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `syllabus_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("syllabus_core version={}", syllabus_core::core_version());
}
