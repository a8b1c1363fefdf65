//! Partner Billing - Subscription billing for the partner portal
//!
//! Keeps one account record per partner, talks to Stripe for customers,
//! checkout and portal sessions, and turns signed Stripe webhooks into plan
//! changes and partner notifications.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
