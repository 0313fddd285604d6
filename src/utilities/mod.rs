//! Shared utilities: errors, prompt text, rate limiting and string helpers.

pub mod errors;
pub mod i18n;
pub mod prompts;
pub mod rpm_controller;
pub mod string_utils;
