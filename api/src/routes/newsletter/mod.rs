mod check_env;
mod overview;
mod send;

pub use check_env::*;
pub use overview::*;
pub use send::*;
pub use send_test::*;
