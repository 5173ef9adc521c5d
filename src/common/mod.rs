pub mod eval;
pub mod logger;
pub mod spaces;
pub mod utils;
pub mod vec_env;
