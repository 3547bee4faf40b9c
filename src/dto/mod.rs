pub mod cart;
pub mod identity;
pub mod orders;
pub mod products;
