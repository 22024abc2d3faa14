// src/utils/mod.rs

pub mod access;
pub mod hash;
pub mod html;
pub mod jwt;
pub mod otp;
pub mod slug;
pub mod topic_forest;
