// SYNOID Bench Library
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod config;
pub mod file_utils;
pub mod interrupt;
pub mod media;
pub mod pipeline;
pub mod report;
