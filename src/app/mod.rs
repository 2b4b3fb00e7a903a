// Application layer: command execution and terminal output on top of core.

pub mod commands;
pub mod report;
