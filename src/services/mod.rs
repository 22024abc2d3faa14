// src/services/mod.rs

pub mod mailer;
pub mod verification;
