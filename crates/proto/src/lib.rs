//! Generated wire types for the control RPC surface (C6), shared by
//! `materializer`, `hub-registry`, and `control` so that none of them
//! depends on another for message definitions. Grounded on the teacher's
//! own `tonic_build::configure().build_server(true).build_client(true)`
//! pattern used to compile its control-plane protos.

tonic::include_proto!("control.v1");
