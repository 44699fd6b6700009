pub mod image_slot;
pub mod policy;
pub mod session;
pub mod turn;
