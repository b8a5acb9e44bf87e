//! Role agents.
//!
//! Every role is a [`RoleSpec`] (name + prompt template + placeholder set)
//! run through the same [`RoleAgent::perform`]. `ConversionRole` and
//! `ReviewRole` only decide which placeholders get which values.

pub mod conversion;
pub mod review;
pub mod role;
pub mod role_agent;

pub use conversion::ConversionRole;
pub use review::ReviewRole;
pub use role::{RoleLoader, RoleSpec, CONVERTER, REVIEWER};
pub use role_agent::{merge_responses, RoleAgent, RoleResponse};
