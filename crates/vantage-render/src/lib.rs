//! Component rendering core
//!
//! A component turns one immutable configuration snapshot into the objects
//! that must exist and the objects that must be removed. Rendering is pure:
//! no I/O and no state carried between passes, so a reconcile driver can
//! re-run it on every event and for many tenants concurrently.

#![deny(missing_docs)]

pub mod calico;
pub mod component;
pub mod images;
pub mod meta;
pub mod network_policy;
pub mod overrides;
pub mod policy_recommendation;

pub use component::{Component, ObjectIdentity, ObjectSet, RenderedObject};
pub use policy_recommendation::{
    PolicyRecommendationComponent, PolicyRecommendationConfig, Topology,
};
