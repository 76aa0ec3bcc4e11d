// src/config/mod.rs

//! Campaign configuration: TOML model, loading, validation and flow
//! construction.

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::build_flow;
pub use loader::{default_campaign_path, load_and_validate, load_from_path};
pub use model::{
    parse_need, Campaign, CampaignSection, DynamicSection, NeedRef, RawCampaign, TaskSection,
    WorkSection,
};
