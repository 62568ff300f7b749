pub mod attempts;
pub mod candidates;
pub mod discovery;
pub mod resolver;
