//! End-to-end tests over real tree files.
//!
//! Each test file covers a specific scenario, using deterministic inputs
//! and checking the structure with `BTree::verify` where it matters.

#![cfg(test)]

mod helpers;

mod test_basic;
mod test_idempotent_remove;
mod test_leaf_split;
mod test_many_inserts;
mod test_persistence;
mod test_random_removal;
mod test_remove_last_key;
mod test_update_overwrites;
