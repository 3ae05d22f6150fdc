//! External service integrations.

pub mod feed_client {
    pub use crate::feed_client::*;
}

pub mod feed_parser {
    pub use crate::feed_parser::*;
}

pub mod feed_service {
    pub use crate::feed_service::*;
}
