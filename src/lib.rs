pub mod configuration;
pub mod controller;
pub mod decoding;
pub mod dump;
pub mod error_handling;
pub mod network;
pub mod session_management;
