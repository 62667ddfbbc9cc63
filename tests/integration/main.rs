#![allow(clippy::expect_used)]

mod common;
mod export_test;
mod pipeline_test;
mod scheduler_test;
