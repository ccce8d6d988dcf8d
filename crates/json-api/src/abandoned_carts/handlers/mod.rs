//! Abandoned Cart Handlers

pub(crate) mod delete;
pub(crate) mod detect;
pub(crate) mod expire;
pub(crate) mod get;
pub(crate) mod get_settings;
pub(crate) mod index;
pub(crate) mod recovered;
pub(crate) mod send_reminders;
pub(crate) mod stats;
pub(crate) mod update_attempt;
pub(crate) mod update_settings;
