pub mod board;
pub mod catalog;
pub mod comment;
pub mod filter;
pub mod post;
pub mod preview;
pub mod settings;
pub mod tree;
pub mod utils;
