//! Colony AI - decision core of a computer-controlled economy player

pub mod core;
pub mod economy;
pub mod engine;
pub mod lifecycle;
pub mod planner;
pub mod player;
pub mod roads;
pub mod scheduler;
pub mod scoring;
pub mod survey;
