// One module per resource; each exposes its handlers by action
pub mod authority;
pub mod me;
pub mod menu_group;
pub mod menu_item;
pub mod role;
pub mod user;
pub mod utils;
