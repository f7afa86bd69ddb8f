// coiisy-common: shared types and wire protocol for the Coiisy workspace

pub mod protocol;
pub mod session;
pub mod types;
