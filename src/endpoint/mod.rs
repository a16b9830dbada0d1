//! External collaborators: pool endpoints, collections and the hosting
//! ledger.
//!
//! The service layer depends only on the traits in [`traits`]. The
//! [`in_memory`] implementations back the development server and tests.

pub mod in_memory;
pub mod traits;

pub use in_memory::{
    EndpointCall, InMemoryEnvironment, ProbeBehavior, StaticCollection, StaticPoolEndpoint,
};
pub use traits::{
    CollectionContract, Environment, InterfaceId, ItemId, NON_FUNGIBLE_INTERFACE_ID, PoolEndpoint,
};
