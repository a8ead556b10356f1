mod access;

pub use access::{AccessGrant, AccessState, RouteKind, RouteTarget, require_access};
