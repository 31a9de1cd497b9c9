//! The control plane core binary (C6 and friends): wires the catalog,
//! activity log, token authority, routing materializer, and hub registry
//! crates behind a single `tonic` RPC surface. Grounded on the teacher's
//! `connector-init` crate, which plays the analogous role of "the one
//! binary that assembles several independent library crates behind a
//! `tonic::transport::Server`".

mod activity_event;
pub mod auth;
pub mod config;
mod context;
pub mod error;
mod fanout;
mod hub_locations;
pub mod replay;
mod rpc;

pub use context::ServerContext;
pub use error::Error;
pub use rpc::ControlServer;
