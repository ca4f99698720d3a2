//! Segment API objects and the calls that fetch them.

mod function;
mod group;
mod permission;
mod role;
mod source;
mod space;
mod user;
mod warehouse;
mod workspace;

pub(crate) use group::Group;
pub(crate) use permission::{Permission, PermissionResource};
pub(crate) use role::Role;
pub(crate) use user::User;
