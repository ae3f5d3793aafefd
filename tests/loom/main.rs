#![cfg(loom)]

mod alloc;
mod reply;
