//! The built-in conversation nodes.
//!
//! ```text
//! receptionist ──complete_task──▶ interview ──complete_interview──▶ end
//!              └─────────────────▶ sales ─────complete_sales──────▶ end
//! ```

pub mod end;
pub mod interview;
pub mod receptionist;
pub mod sales;

pub use end::EndNode;
pub use interview::InterviewNode;
pub use receptionist::ReceptionistNode;
pub use sales::SalesNode;

use switchboard_core::session::{Session, keys};

pub const RECEPTIONIST: &str = "receptionist";
pub const INTERVIEW: &str = "interview";
pub const SALES: &str = "sales";
pub const END: &str = "end";

/// The collected username, or `fallback` before `save_user_data` ran.
pub(crate) fn username_or<'a>(session: &'a Session, fallback: &'a str) -> &'a str {
    session
        .get_variable(keys::USER_DATA)
        .and_then(|data| data.get("username"))
        .and_then(|name| name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback)
}
