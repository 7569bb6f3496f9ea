pub mod health;
pub mod navigation;
pub mod session;
