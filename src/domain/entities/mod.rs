pub mod enrollment_strategy;
pub mod waitlist_email;
pub mod waitlist_entry;
