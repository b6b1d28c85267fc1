pub mod bitset;
pub mod intent_lock;
pub mod u8_keys;
