//! Gaia protocol client
//!
//! Client for Gaia storage hubs: challenge/token authorization, authorized
//! PUT/GET/DELETE, batch execution over nested operation descriptors, and
//! paginated listing. Cryptography lives in `gaia-core`; this crate adds the
//! protocol and the session state machine on top.

pub mod batch;
pub mod hub;
pub mod listing;
pub mod session;
pub mod token;

pub use batch::{perform_files, BatchGroup, BatchNode, BatchOp, BatchOpKind, FileOps};
pub use hub::{FileResponse, GaiaHubConfig, Hub, HubInfo};
pub use listing::{walk_listing, ListPage};
pub use session::{
    DeleteOptions, GetOptions, InMemorySessionStore, PutOptions, Session, SessionStore,
};
pub use token::{make_v1_auth_token, supports_v1_auth, AuthScope};
