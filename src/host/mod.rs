//! The CMS host the reorder plugin plugs into.
//!
//! ```text
//! HostConfig ──plugin::apply──> HostConfig' ──Host::new──> Host
//!                                                 │
//!                      hooks, field access  ──────┤
//!                                                 v
//!                                          DocumentStore (SqliteStore)
//! ```
//!
//! | Module    | Responsibility                                            |
//! |-----------|-----------------------------------------------------------|
//! | `config`  | Host configuration: collections, fields, hooks, endpoints |
//! | `store`   | `DocumentStore` trait and document/query types            |
//! | `sqlite`  | SQLite store via `DbHandle` (blocking pool)               |
//! | `runtime` | `Host`: field access and hooks around the store           |
//! | `request` | `RequestContext` and `User`                               |

pub mod config;
pub mod request;
pub mod runtime;
pub mod sqlite;
pub mod store;

pub use config::{
    AccessRule, BeforeValidateHook, CollectionConfig, EndpointConfig, EndpointHandler,
    EndpointMethod, FieldConfig, FieldType, HookArgs, HostConfig, OnInit, Operation,
};
pub use request::{RequestContext, User};
pub use runtime::{AccessMode, Host};
pub use sqlite::SqliteStore;
pub use store::{DocData, DocId, Document, DocumentStore, FindQuery, PaginatedDocs, Sort};

#[cfg(test)]
pub(crate) mod testing;
