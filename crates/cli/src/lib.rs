//! Library side of the command-line front end.
pub mod commands;
