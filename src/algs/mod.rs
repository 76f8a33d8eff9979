//! Assembly driver and the communication layer it finalizes through.

pub mod assembly;
pub mod communicator;
