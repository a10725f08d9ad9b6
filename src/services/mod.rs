pub mod assigner;
pub mod bootstrap;
pub mod menu;
pub mod registrar;
pub mod session;
