//! Tool handlers for the Switchboard workflow.
//!
//! Each handler backs one [`ToolKind`]: collecting user details, declaring a
//! routing intent, closing an interview or sales conversation, and looking up
//! catalog products.

pub mod args;
pub mod complete_interview;
pub mod complete_sales;
pub mod complete_task;
pub mod get_product_info;
pub mod save_user_data;

use switchboard_core::tool::{ToolKind, ToolRegistry};

pub use complete_interview::CompleteInterviewTool;
pub use complete_sales::CompleteSalesTool;
pub use complete_task::CompleteTaskTool;
pub use get_product_info::GetProductInfoTool;
pub use save_user_data::SaveUserDataTool;

/// Create a registry with a handler for every [`ToolKind`].
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SaveUserDataTool));
    registry.register(Box::new(CompleteTaskTool));
    registry.register(Box::new(CompleteInterviewTool));
    registry.register(Box::new(CompleteSalesTool));
    registry.register(Box::new(GetProductInfoTool));
    debug_assert_eq!(registry.kinds().len(), ToolKind::ALL.len());
    registry
}
