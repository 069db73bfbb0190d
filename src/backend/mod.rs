pub mod common;
pub mod headless;
pub mod input;
pub mod movement;
pub mod redirect;
pub mod selector;
pub mod source;
