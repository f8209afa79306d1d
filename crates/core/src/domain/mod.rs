pub mod cart;
pub mod sync;
