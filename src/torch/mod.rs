pub mod constants;
pub mod feed;
pub mod load;
pub mod model;
pub mod reward;
#[cfg(test)]
mod reward_tests;
