//! # Gamespine
//!
//! Backbone relay and matchmaking server for networked games.
//!
//! A Gamespine backbone sits between game *providers* (processes able to
//! host games) and game *consumers* (players). Clients speak a plain
//! line-oriented text protocol over TCP; the backbone matches consumers
//! to the least-loaded provider for a kind of game and then relays the
//! game traffic between them, without understanding it.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use gamespine::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GamespineError> {
//!     let server = BackboneServer::builder()
//!         .bind("0.0.0.0:45000")
//!         .build(MirrorValidator)
//!         .await?;
//!     server.run().await
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::GamespineError;
pub use server::{BackboneServer, BackboneServerBuilder};

/// The common imports for embedding a backbone server.
pub mod prelude {
    pub use gamespine_broker::{Broker, Flow};
    pub use gamespine_protocol::{GameDefinition, GameId, SessionId};
    pub use gamespine_session::{LoginValidator, MirrorValidator};

    pub use crate::error::GamespineError;
    pub use crate::server::{BackboneServer, BackboneServerBuilder};
}
