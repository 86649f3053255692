//! `pantry-alerts`: expiry alert computation and delivery.
//!
//! # Pipeline
//!
//! | Stage      | Module      | Notes                                            |
//! |------------|-------------|--------------------------------------------------|
//! | Evaluate   | `window`    | items with expiry in `[today-7, today+days_ahead]` |
//! | Format     | `format`    | pure, assigns urgency tiers                      |
//! | Render     | `render`    | HTML body for the mail transport                 |
//! | Deliver    | `sender`    | never fails past its boundary                    |
//!
//! [`pipeline::AlertPipeline`] chains the stages and owns the single-flight
//! gate shared by scheduled and manual runs.

pub mod error;
pub mod format;
pub mod pipeline;
pub mod render;
pub mod resend;
pub mod sender;
pub mod transport;
pub mod window;

pub use error::{AlertError, Result};
pub use format::{format_alert, AlertItem, AlertPayload, Urgency};
pub use pipeline::{AlertPipeline, AlertSettings, CheckReport, NotificationStatus, RunReport};
pub use render::AlertRenderer;
pub use resend::ResendTransport;
pub use sender::{NotificationSender, SendErrorKind, SendResult};
pub use transport::{MailTransport, NullTransport, SentEmail, TransportError};
pub use window::{find_near_expiry, ExpiryWindow};
