pub mod fmt;
pub mod intern;
#[cfg(test)]
pub(crate) mod test_utils;
