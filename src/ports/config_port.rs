//! Configuration access port.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Integer value of `key`, `None` when missing or not an integer.
    fn get_int(&self, section: &str, key: &str) -> Option<i64>;
}
