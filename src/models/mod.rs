// Data models for the VMC control plane

pub mod operation;
pub mod vmc;
