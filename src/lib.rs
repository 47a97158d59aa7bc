pub mod base;
pub mod trie;
pub mod sim;
pub mod ui;
