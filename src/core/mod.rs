// Domain-layer modules and shared errors/models
pub mod catalog {
    pub use crate::catalog::*;
}

pub mod classifier {
    pub use crate::classifier::*;
}

pub mod matcher {
    pub use crate::matcher::*;
}

pub mod normalizer {
    pub use crate::normalizer::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
